pub mod pool;

pub use pool::{PoolReply, ResolverPool, UpstreamHealth};
