use super::policy::PeerPolicy;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use bgp_dns_application::ports::{BgpGlobal, BgpSpeaker};
use bgp_dns_domain::config::PeerConfig;
use bgp_dns_domain::{BgpPath, DomainError, PrefixLookup};
use ipnetwork::IpNetwork;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 1024;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone)]
struct Neighbor {
    config: PeerConfig,
    policy: PeerPolicy,
}

#[derive(Default)]
struct RibState {
    global: Option<BgpGlobal>,
    /// Paths per prefix in insertion order; the first one is best.
    table: BTreeMap<IpNetwork, Vec<BgpPath>>,
    neighbors: BTreeMap<IpAddr, Neighbor>,
}

impl RibState {
    fn running(&self) -> Result<&BgpGlobal, DomainError> {
        self.global
            .as_ref()
            .ok_or_else(|| DomainError::BgpEngine("speaker is not running".to_string()))
    }
}

/// In-process stand-in for a BGP engine.
///
/// Holds the global table and neighbor policies, and broadcasts best-path
/// changes back to this process. It opens no sessions: neighbors never
/// receive the originated paths and no path is ever learned from them.
/// A wire engine plugs in behind the same [`BgpSpeaker`] port.
pub struct LoopbackRib {
    state: RwLock<RibState>,
    events: broadcast::Sender<Vec<BgpPath>>,
    log_level: ArcSwap<String>,
}

impl Default for LoopbackRib {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackRib {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(RibState::default()),
            events,
            log_level: ArcSwap::from_pointee("info".to_string()),
        }
    }

    pub async fn neighbors(&self) -> Vec<PeerConfig> {
        let state = self.state.read().await;
        state.neighbors.values().map(|n| n.config.clone()).collect()
    }

    pub async fn policy(&self, address: IpAddr) -> Option<PeerPolicy> {
        let state = self.state.read().await;
        state.neighbors.get(&address).map(|n| n.policy.clone())
    }

    /// Best paths as exported to `address` after its policy.
    pub async fn advertised_to(&self, address: IpAddr) -> Result<Vec<BgpPath>, DomainError> {
        let state = self.state.read().await;
        let neighbor = state
            .neighbors
            .get(&address)
            .ok_or_else(|| DomainError::BgpEngine(format!("unknown neighbor {}", address)))?;
        Ok(state
            .table
            .values()
            .filter_map(|paths| paths.first())
            .filter_map(|best| neighbor.policy.export(best))
            .collect())
    }

    fn publish(&self, change: BgpPath) {
        debug!(path = %change, "Best path changed");
        // No subscribers is fine.
        let _ = self.events.send(vec![change]);
    }
}

fn matches(candidate: &IpNetwork, prefix: &IpNetwork, lookup: PrefixLookup) -> bool {
    match lookup {
        PrefixLookup::Exact => candidate == prefix,
        PrefixLookup::ShorterOrEqual => {
            candidate.prefix() <= prefix.prefix() && candidate.contains(prefix.network())
        }
        PrefixLookup::Longer => {
            candidate.prefix() >= prefix.prefix() && prefix.contains(candidate.network())
        }
    }
}

#[async_trait]
impl BgpSpeaker for LoopbackRib {
    async fn start(&self, global: &BgpGlobal) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if let Some(running) = &state.global {
            return Err(DomainError::BgpEngine(format!(
                "speaker already running as AS{}",
                running.asn
            )));
        }
        if global.asn == 0 || global.router_id.is_unspecified() {
            return Err(DomainError::BgpEngine(
                "ASN and router ID are required".to_string(),
            ));
        }
        info!(
            asn = global.asn,
            router_id = %global.router_id,
            listen = %global.listen,
            "Loopback BGP speaker started"
        );
        warn!(
            listen = %global.listen,
            "No BGP sessions are established, paths stay inside this process"
        );
        state.global = Some(global.clone());
        Ok(())
    }

    async fn stop(&self) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.running()?;
        let paths: usize = state.table.values().map(Vec::len).sum();
        *state = RibState::default();
        info!(paths, "BGP speaker stopped");
        Ok(())
    }

    async fn add_peer(&self, peer: &PeerConfig) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let local_asn = state.running()?.asn;
        if state.neighbors.contains_key(&peer.address) {
            return Err(DomainError::BgpEngine(format!(
                "neighbor {} already configured",
                peer.address
            )));
        }

        let policy = PeerPolicy::for_peer(peer, local_asn);
        info!(
            peer = %peer.address,
            asn = peer.asn,
            ibgp = peer.is_ibgp(local_asn),
            passive = peer.passive,
            multihop = ?peer.multihop,
            policy = %policy.name,
            "Neighbor registered without a session"
        );
        state.neighbors.insert(
            peer.address,
            Neighbor {
                config: peer.clone(),
                policy,
            },
        );
        Ok(())
    }

    async fn remove_peer(&self, address: IpAddr) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.running()?;
        match state.neighbors.remove(&address) {
            Some(_) => {
                info!(peer = %address, "Neighbor removed");
                Ok(())
            }
            None => Err(DomainError::BgpEngine(format!("unknown neighbor {}", address))),
        }
    }

    async fn add_path(&self, path: BgpPath) -> Result<(), DomainError> {
        if path.is_withdraw {
            return self.delete_path(path).await;
        }

        let mut state = self.state.write().await;
        state.running()?;

        let paths = state.table.entry(path.prefix).or_default();
        let best_changed = match paths.iter().position(|p| p.next_hop == path.next_hop) {
            Some(idx) => {
                let changed = paths[idx] != path;
                paths[idx] = path.clone();
                idx == 0 && changed
            }
            None => {
                paths.push(path.clone());
                paths.len() == 1
            }
        };
        drop(state);

        if best_changed {
            self.publish(path);
        }
        Ok(())
    }

    async fn delete_path(&self, path: BgpPath) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.running()?;

        let Some(paths) = state.table.get_mut(&path.prefix) else {
            warn!(path = %path, "Delete of unknown prefix");
            return Err(DomainError::BgpEngine(format!("no path for {}", path.prefix)));
        };
        let Some(idx) = paths.iter().position(|p| p.next_hop == path.next_hop) else {
            warn!(path = %path, "Delete of unknown next hop");
            return Err(DomainError::BgpEngine(format!(
                "no path for {} via {}",
                path.prefix, path.next_hop
            )));
        };

        let removed = paths.remove(idx);
        let change = match (idx, paths.first()) {
            (0, Some(next_best)) => Some(next_best.clone()),
            (0, None) => Some(removed.withdrawn()),
            _ => None,
        };
        if paths.is_empty() {
            state.table.remove(&path.prefix);
        }
        drop(state);

        if let Some(change) = change {
            self.publish(change);
        }
        Ok(())
    }

    async fn list_paths(
        &self,
        prefix: IpNetwork,
        lookup: PrefixLookup,
    ) -> Result<Vec<BgpPath>, DomainError> {
        let state = self.state.read().await;
        state.running()?;
        Ok(state
            .table
            .iter()
            .filter(|(candidate, _)| matches(candidate, &prefix, lookup))
            .flat_map(|(_, paths)| paths.iter().cloned())
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<BgpPath>> {
        self.events.subscribe()
    }

    fn set_log_level(&self, level: &str) -> Result<(), DomainError> {
        let level = level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(DomainError::BgpEngine(format!("unknown log level '{}'", level)));
        }
        self.log_level.store(Arc::new(level));
        Ok(())
    }

    fn log_level(&self) -> String {
        self.log_level.load().as_ref().clone()
    }
}
