use async_trait::async_trait;
use bgp_dns_domain::config::{BgpConfig, PeerConfig};
use bgp_dns_domain::{BgpPath, DomainError, PrefixLookup};
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::sync::broadcast;

/// Global parameters of the local speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpGlobal {
    pub asn: u32,
    pub router_id: Ipv4Addr,
    pub listen: SocketAddr,
}

impl From<&BgpConfig> for BgpGlobal {
    fn from(config: &BgpConfig) -> Self {
        Self {
            asn: config.asn,
            router_id: config.router_id,
            listen: config.listen,
        }
    }
}

/// Boundary to the BGP routing engine.
///
/// The engine owns sessions and the global RIB; this process only originates
/// host routes and observes best-path changes.
#[async_trait]
pub trait BgpSpeaker: Send + Sync {
    async fn start(&self, global: &BgpGlobal) -> Result<(), DomainError>;

    async fn stop(&self) -> Result<(), DomainError>;

    async fn add_peer(&self, peer: &PeerConfig) -> Result<(), DomainError>;

    async fn remove_peer(&self, address: IpAddr) -> Result<(), DomainError>;

    async fn add_path(&self, path: BgpPath) -> Result<(), DomainError>;

    async fn delete_path(&self, path: BgpPath) -> Result<(), DomainError>;

    async fn list_paths(
        &self,
        prefix: IpNetwork,
        lookup: PrefixLookup,
    ) -> Result<Vec<BgpPath>, DomainError>;

    /// Best-path change events. Withdrawals arrive with `is_withdraw` set.
    fn subscribe(&self) -> broadcast::Receiver<Vec<BgpPath>>;

    fn set_log_level(&self, level: &str) -> Result<(), DomainError>;

    fn log_level(&self) -> String;
}
