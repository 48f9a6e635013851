use async_trait::async_trait;
use bgp_dns_application::ports::{BgpGlobal, BgpSpeaker};
use bgp_dns_domain::config::PeerConfig;
use bgp_dns_domain::{BgpPath, DomainError, PrefixLookup};
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub enum SpeakerCall {
    Add(BgpPath),
    Delete(BgpPath),
}

// ============================================================================
// Mock BgpSpeaker
// ============================================================================

#[derive(Clone)]
pub struct MockBgpSpeaker {
    calls: Arc<Mutex<Vec<SpeakerCall>>>,
    rib: Arc<Mutex<Vec<BgpPath>>>,
    should_fail: Arc<AtomicBool>,
    events: broadcast::Sender<Vec<BgpPath>>,
}

impl MockBgpSpeaker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            rib: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Pre-populates the RIB without recording a call.
    pub fn with_path(self, path: BgpPath) -> Self {
        self.rib.lock().unwrap().push(path);
        self
    }

    pub fn calls(&self) -> Vec<SpeakerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn added(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SpeakerCall::Add(p) => Some(p.prefix.to_string()),
                SpeakerCall::Delete(_) => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SpeakerCall::Delete(p) => Some(p.prefix.to_string()),
                SpeakerCall::Add(_) => None,
            })
            .collect()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub fn publish(&self, paths: Vec<BgpPath>) {
        let _ = self.events.send(paths);
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::BgpEngine("mock failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BgpSpeaker for MockBgpSpeaker {
    async fn start(&self, _global: &BgpGlobal) -> Result<(), DomainError> {
        self.check()
    }

    async fn stop(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn add_peer(&self, _peer: &PeerConfig) -> Result<(), DomainError> {
        self.check()
    }

    async fn remove_peer(&self, _address: IpAddr) -> Result<(), DomainError> {
        self.check()
    }

    async fn add_path(&self, path: BgpPath) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push(SpeakerCall::Add(path.clone()));
        self.check()?;
        self.rib.lock().unwrap().push(path);
        Ok(())
    }

    async fn delete_path(&self, path: BgpPath) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push(SpeakerCall::Delete(path.clone()));
        self.check()?;
        self.rib
            .lock()
            .unwrap()
            .retain(|p| !(p.prefix == path.prefix && p.next_hop == path.next_hop));
        Ok(())
    }

    async fn list_paths(
        &self,
        prefix: IpNetwork,
        lookup: PrefixLookup,
    ) -> Result<Vec<BgpPath>, DomainError> {
        self.check()?;
        let rib = self.rib.lock().unwrap();
        Ok(rib
            .iter()
            .filter(|p| match lookup {
                PrefixLookup::Exact => p.prefix == prefix,
                PrefixLookup::ShorterOrEqual => {
                    p.prefix.prefix() <= prefix.prefix() && p.prefix.contains(prefix.network())
                }
                PrefixLookup::Longer => {
                    p.prefix.prefix() >= prefix.prefix() && prefix.contains(p.prefix.network())
                }
            })
            .cloned()
            .collect())
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
