pub mod loopback_rib;
pub mod policy;

pub use loopback_rib::LoopbackRib;
pub use policy::{ExportStatement, PeerPolicy, PolicyAction};
