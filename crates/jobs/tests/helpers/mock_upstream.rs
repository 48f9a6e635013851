use async_trait::async_trait;
use bgp_dns_application::ports::DnsUpstream;
use bgp_dns_domain::{AnswerStatus, DomainError, Fqdn, UpstreamAnswer};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Fixed A answers by name; anything else is an empty NOERROR.
#[derive(Clone, Default)]
pub struct MockUpstream {
    answers: Arc<Mutex<HashMap<Fqdn, (Vec<Ipv4Addr>, u32)>>>,
    call_count: Arc<AtomicU64>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_answer(&self, name: &str, addresses: &[&str], ttl: u32) {
        let addresses = addresses.iter().map(|a| a.parse().unwrap()).collect();
        self.answers
            .lock()
            .unwrap()
            .insert(Fqdn::new(name).unwrap(), (addresses, ttl));
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DnsUpstream for MockUpstream {
    async fn resolve_a(&self, name: &Fqdn) -> Result<UpstreamAnswer, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let (addresses, ttl) = self
            .answers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default();
        Ok(UpstreamAnswer {
            status: AnswerStatus::NoError,
            ttl: (!addresses.is_empty()).then_some(ttl),
            addresses,
            raw: Bytes::new(),
        })
    }
}
