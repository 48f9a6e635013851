#![allow(dead_code)]

mod mock_bgp_speaker;
mod mock_kernel_table;
mod mock_upstream;

pub use mock_bgp_speaker::{MockBgpSpeaker, SpeakerCall};
pub use mock_kernel_table::{KernelCall, MockKernelTable};
pub use mock_upstream::MockUpstream;

use bgp_dns_domain::config::{BgpConfig, CacheConfig};
use bgp_dns_domain::Community;
use std::net::Ipv4Addr;

pub const ROUTER_ID: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const LOCAL_ASN: u32 = 65001;

pub fn bgp_config() -> BgpConfig {
    BgpConfig {
        asn: LOCAL_ASN,
        router_id: ROUTER_ID,
        communities: vec![Community::new(65001, 100)],
        ..BgpConfig::default()
    }
}

pub fn cache_config() -> CacheConfig {
    CacheConfig {
        max_entries: 100,
        min_ttl: 1,
        ttl_floor: 60,
        ttl_jitter: 10,
        default_ttl: 30,
    }
}

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}
