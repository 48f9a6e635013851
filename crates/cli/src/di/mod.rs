pub mod bgp;
pub mod dns;
pub mod routes;

pub use bgp::BgpServices;
pub use dns::DnsServices;
pub use routes::RouteServices;

/// Queue depth of every actor mailbox.
pub const MAILBOX_CAPACITY: usize = 1024;
