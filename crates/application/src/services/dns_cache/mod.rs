mod engine;
mod entry;
mod ttl;

pub use engine::{CacheCommand, CacheMailbox, DnsCacheEngine};
pub use entry::{CacheEntry, CachedAnswer};
pub use ttl::TtlPolicy;
