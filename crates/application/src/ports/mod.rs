mod bgp_speaker;
mod dns_upstream;
mod kernel_routes;

pub use bgp_speaker::{BgpGlobal, BgpSpeaker};
pub use dns_upstream::DnsUpstream;
pub use kernel_routes::KernelRouteTable;
