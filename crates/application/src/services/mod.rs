pub mod dns_cache;
pub mod kernel_reconciler;
pub mod route_refcount;

pub use dns_cache::{CacheCommand, CacheMailbox, CachedAnswer, DnsCacheEngine, TtlPolicy};
pub use kernel_reconciler::{KernelCommand, KernelMailbox, KernelReconciler};
pub use route_refcount::{RefCountCommand, RefCountMailbox, RouteRefCounter};
