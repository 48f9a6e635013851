use crate::Community;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// BGP speaker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BgpConfig {
    /// Local autonomous system number
    #[serde(default)]
    pub asn: u32,

    /// Router ID, also the next-hop of every originated host route
    #[serde(default = "default_router_id")]
    pub router_id: Ipv4Addr,

    /// Listen address for incoming sessions (default: "0.0.0.0:179")
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Communities stamped on every originated host route
    #[serde(default)]
    pub communities: Vec<Community>,

    /// Log level handed to the routing engine (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

/// A configured BGP neighbor
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PeerConfig {
    pub address: IpAddr,

    /// Remote ASN; equal to the local ASN makes this an iBGP session
    pub asn: u32,

    /// eBGP multihop TTL
    #[serde(default)]
    pub multihop: Option<u8>,

    /// Wait for the neighbor to connect instead of dialing out
    #[serde(default)]
    pub passive: bool,

    /// Communities added to every path exported to this neighbor.
    /// Setting any also enables export to an eBGP neighbor.
    #[serde(default)]
    pub communities: Vec<Community>,
}

impl PeerConfig {
    pub fn is_ibgp(&self, local_asn: u32) -> bool {
        self.asn == local_asn
    }
}

impl Default for BgpConfig {
    fn default() -> Self {
        Self {
            asn: 0,
            router_id: default_router_id(),
            listen: default_listen(),
            communities: Vec::new(),
            log_level: default_log_level(),
            peers: Vec::new(),
        }
    }
}

fn default_router_id() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 179))
}

fn default_log_level() -> String {
    "info".to_string()
}
