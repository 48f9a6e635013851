#![allow(dead_code)]

mod mock_bgp_speaker;
mod mock_kernel_table;
mod mock_upstream;

pub use mock_bgp_speaker::MockBgpSpeaker;
pub use mock_kernel_table::{KernelCall, MockKernelTable};
pub use mock_upstream::MockUpstream;

use bgp_dns_application::actor;
use bgp_dns_application::services::{
    CacheMailbox, DnsCacheEngine, KernelMailbox, KernelReconciler, RouteRefCounter,
};
use bgp_dns_domain::config::{BgpConfig, CacheConfig};
use bgp_dns_domain::{AddressFamily, BgpPath, Community};
use ipnetwork::{IpNetwork, Ipv4Network};
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const ROUTER_ID: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const LOCAL_ASN: u32 = 65001;
pub const METRIC: u32 = 100;

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

pub fn learned(prefix: &str, next_hop: &str, communities: Option<Vec<Community>>) -> BgpPath {
    let net: Ipv4Network = prefix.parse().unwrap();
    BgpPath {
        prefix: IpNetwork::V4(net),
        next_hop: IpAddr::V4(ip(next_hop)),
        as_path: vec![65010],
        communities,
        ..BgpPath::host_route(net.network(), ROUTER_ID, LOCAL_ASN, &[])
    }
}

pub fn learned_v6(prefix: &str, communities: Option<Vec<Community>>) -> BgpPath {
    BgpPath {
        family: AddressFamily::Ipv6Unicast,
        prefix: prefix.parse().unwrap(),
        next_hop: "2001:db8::1".parse().unwrap(),
        communities,
        ..learned("10.0.0.0/8", "192.0.2.10", None)
    }
}

pub fn write_list(path: &Path, names: &[&str]) {
    let mut file = std::fs::File::create(path).unwrap();
    for name in names {
        writeln!(file, "{}", name).unwrap();
    }
    file.sync_all().unwrap();
}

/// Cache actor backed by a refcount actor over `speaker`.
pub fn spawn_cache(
    upstream: &MockUpstream,
    speaker: &MockBgpSpeaker,
    shutdown: &CancellationToken,
) -> CacheMailbox {
    let bgp = BgpConfig {
        asn: LOCAL_ASN,
        router_id: ROUTER_ID,
        ..BgpConfig::default()
    };
    let (routes, _) = actor::spawn(
        "route-refcount",
        RouteRefCounter::new(Arc::new(speaker.clone()), &bgp),
        64,
        shutdown.clone(),
    );
    let (cache, _) = actor::spawn(
        "dns-cache",
        DnsCacheEngine::new(Arc::new(upstream.clone()), routes, &CacheConfig::default()),
        64,
        shutdown.clone(),
    );
    cache
}

pub fn spawn_kernel(table: &MockKernelTable, shutdown: &CancellationToken) -> KernelMailbox {
    let (kernel, _) = actor::spawn(
        "kernel-routes",
        KernelReconciler::new(Arc::new(table.clone())),
        64,
        shutdown.clone(),
    );
    kernel
}
