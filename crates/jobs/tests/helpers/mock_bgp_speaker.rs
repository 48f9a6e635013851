use async_trait::async_trait;
use bgp_dns_application::ports::{BgpGlobal, BgpSpeaker};
use bgp_dns_domain::config::PeerConfig;
use bgp_dns_domain::{BgpPath, DomainError, PrefixLookup};
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

// ============================================================================
// Mock BgpSpeaker: event source plus a log of withdrawn prefixes
// ============================================================================

#[derive(Clone)]
pub struct MockBgpSpeaker {
    deleted: Arc<Mutex<Vec<String>>>,
    events: broadcast::Sender<Vec<BgpPath>>,
}

impl MockBgpSpeaker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            deleted: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Delivers a best-path event to every subscriber.
    pub fn publish(&self, paths: Vec<BgpPath>) {
        let _ = self.events.send(paths);
    }
}

#[async_trait]
impl BgpSpeaker for MockBgpSpeaker {
    async fn start(&self, _global: &BgpGlobal) -> Result<(), DomainError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn add_peer(&self, _peer: &PeerConfig) -> Result<(), DomainError> {
        Ok(())
    }

    async fn remove_peer(&self, _address: IpAddr) -> Result<(), DomainError> {
        Ok(())
    }

    async fn add_path(&self, _path: BgpPath) -> Result<(), DomainError> {
        Ok(())
    }

    async fn delete_path(&self, path: BgpPath) -> Result<(), DomainError> {
        self.deleted.lock().unwrap().push(path.prefix.to_string());
        Ok(())
    }

    async fn list_paths(
        &self,
        _prefix: IpNetwork,
        _lookup: PrefixLookup,
    ) -> Result<Vec<BgpPath>, DomainError> {
        Ok(Vec::new())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<BgpPath>> {
        self.events.subscribe()
    }

    fn set_log_level(&self, _level: &str) -> Result<(), DomainError> {
        Ok(())
    }

    fn log_level(&self) -> String {
        "info".to_string()
    }
}
