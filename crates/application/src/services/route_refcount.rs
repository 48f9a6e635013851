use crate::actor::{Handler, Mailbox};
use crate::ports::BgpSpeaker;
use async_trait::async_trait;
use bgp_dns_domain::config::BgpConfig;
use bgp_dns_domain::{BgpPath, Community, DomainError, PrefixLookup};
use ipnetwork::{IpNetwork, Ipv4Network};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub enum RefCountCommand {
    Advance(Vec<Ipv4Addr>),
    Withdraw(Vec<Ipv4Addr>),
    Snapshot(oneshot::Sender<BTreeMap<Ipv4Addr, u32>>),
}

pub type RefCountMailbox = Mailbox<RefCountCommand>;

#[derive(Debug, Clone, Copy)]
struct RefEntry {
    count: u32,
    /// False when a covering local path made our own /32 unnecessary,
    /// or when the engine rejected it.
    announced: bool,
}

/// Counts how many cached names resolve to each address and keeps exactly
/// one host route per address with a non-zero count.
pub struct RouteRefCounter {
    speaker: Arc<dyn BgpSpeaker>,
    router_id: Ipv4Addr,
    asn: u32,
    communities: Vec<Community>,
    entries: FxHashMap<Ipv4Addr, RefEntry>,
}

impl RouteRefCounter {
    pub fn new(speaker: Arc<dyn BgpSpeaker>, config: &BgpConfig) -> Self {
        Self {
            speaker,
            router_id: config.router_id,
            asn: config.asn,
            communities: config.communities.clone(),
            entries: FxHashMap::default(),
        }
    }

    pub fn count(&self, address: Ipv4Addr) -> u32 {
        self.entries.get(&address).map_or(0, |e| e.count)
    }

    pub async fn advance(&mut self, addresses: &[Ipv4Addr]) {
        for &address in addresses {
            if let Some(entry) = self.entries.get_mut(&address) {
                entry.count = entry.count.saturating_add(1);
                debug!(%address, count = entry.count, "Route reference added");
                continue;
            }

            let announced = self.announce(address).await;
            self.entries.insert(
                address,
                RefEntry {
                    count: 1,
                    announced,
                },
            );
        }
    }

    pub async fn withdraw(&mut self, addresses: &[Ipv4Addr]) {
        for &address in addresses {
            let Some(entry) = self.entries.get_mut(&address) else {
                debug!(%address, "Withdraw for untracked address ignored");
                continue;
            };

            entry.count = entry.count.saturating_sub(1);
            if entry.count > 0 {
                debug!(%address, count = entry.count, "Route reference released");
                continue;
            }

            let announced = entry.announced;
            self.entries.remove(&address);

            if announced {
                let path = self.host_route(address).withdrawn();
                match self.speaker.delete_path(path).await {
                    Ok(()) => info!(%address, "Host route withdrawn"),
                    Err(e) => warn!(%address, error = %e, "Failed to withdraw host route"),
                }
            }
        }
    }

    /// Adds the /32 unless a path this router originates already covers it.
    async fn announce(&self, address: Ipv4Addr) -> bool {
        let prefix = IpNetwork::V4(Ipv4Network::from(address));
        match self
            .speaker
            .list_paths(prefix, PrefixLookup::ShorterOrEqual)
            .await
        {
            Ok(paths) => {
                let local = IpAddr::V4(self.router_id);
                if let Some(covering) = paths
                    .iter()
                    .find(|p| !p.is_withdraw && p.next_hop == local)
                {
                    debug!(%address, covering = %covering.prefix, "Address already covered by a local path");
                    return false;
                }
            }
            Err(e) => {
                warn!(%address, error = %e, "RIB lookup failed, announcing anyway");
            }
        }

        match self.speaker.add_path(self.host_route(address)).await {
            Ok(()) => {
                info!(%address, "Host route announced");
                true
            }
            Err(e) => {
                warn!(%address, error = %e, "Failed to announce host route");
                false
            }
        }
    }

    fn host_route(&self, address: Ipv4Addr) -> BgpPath {
        BgpPath::host_route(address, self.router_id, self.asn, &self.communities)
    }

    fn snapshot(&self) -> BTreeMap<Ipv4Addr, u32> {
        self.entries.iter().map(|(ip, e)| (*ip, e.count)).collect()
    }
}

#[async_trait]
impl Handler for RouteRefCounter {
    type Message = RefCountCommand;

    async fn handle(&mut self, message: RefCountCommand) -> Result<(), DomainError> {
        match message {
            RefCountCommand::Advance(addresses) => self.advance(&addresses).await,
            RefCountCommand::Withdraw(addresses) => self.withdraw(&addresses).await,
            RefCountCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
        Ok(())
    }
}

impl Mailbox<RefCountCommand> {
    pub async fn advance(&self, addresses: Vec<Ipv4Addr>) -> Result<(), DomainError> {
        self.tell(RefCountCommand::Advance(addresses)).await
    }

    pub async fn withdraw(&self, addresses: Vec<Ipv4Addr>) -> Result<(), DomainError> {
        self.tell(RefCountCommand::Withdraw(addresses)).await
    }

    /// Current non-zero counts, after every previously submitted command.
    pub async fn counts(&self) -> Result<BTreeMap<Ipv4Addr, u32>, DomainError> {
        let (reply, counts) = oneshot::channel();
        self.tell(RefCountCommand::Snapshot(reply)).await?;
        counts.await.map_err(|_| self.stopped())
    }
}
