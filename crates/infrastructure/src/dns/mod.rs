pub mod forwarding;
pub mod load_balancer;
pub mod server;
pub mod transport;

pub use load_balancer::ResolverPool;
pub use server::DnsResponder;
