use async_trait::async_trait;
use bgp_dns_application::ports::DnsUpstream;
use bgp_dns_domain::{AnswerStatus, DomainError, Fqdn, UpstreamAnswer};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Scripted {
    Answer(UpstreamAnswer),
    Timeout,
}

// ============================================================================
// Mock DnsUpstream
// ============================================================================

/// Unscripted names resolve to an empty NOERROR answer.
#[derive(Clone, Default)]
pub struct MockUpstream {
    script: Arc<Mutex<HashMap<String, Scripted>>>,
    call_count: Arc<AtomicU64>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_answer(&self, name: &str, addresses: &[&str], ttl: u32) {
        let addresses: Vec<Ipv4Addr> = addresses.iter().map(|a| a.parse().unwrap()).collect();
        let answer = UpstreamAnswer {
            status: AnswerStatus::NoError,
            ttl: if addresses.is_empty() { None } else { Some(ttl) },
            addresses,
            raw: Bytes::from_static(b"raw"),
        };
        self.insert(name, Scripted::Answer(answer));
    }

    pub fn set_status(&self, name: &str, status: AnswerStatus) {
        let answer = UpstreamAnswer {
            status,
            addresses: Vec::new(),
            ttl: None,
            raw: Bytes::new(),
        };
        self.insert(name, Scripted::Answer(answer));
    }

    pub fn set_timeout(&self, name: &str) {
        self.insert(name, Scripted::Timeout);
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn insert(&self, name: &str, scripted: Scripted) {
        let key = Fqdn::new(name).unwrap().to_string();
        self.script.lock().unwrap().insert(key, scripted);
    }
}

#[async_trait]
impl DnsUpstream for MockUpstream {
    async fn resolve_a(&self, name: &Fqdn) -> Result<UpstreamAnswer, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let scripted = self.script.lock().unwrap().get(name.as_str()).cloned();
        match scripted {
            Some(Scripted::Answer(answer)) => Ok(answer),
            Some(Scripted::Timeout) => Err(DomainError::AllUpstreamsFailed {
                attempts: 1,
                last: Box::new(DomainError::TransportTimeout {
                    server: SocketAddr::from(([127, 0, 0, 1], 53)),
                }),
            }),
            None => Ok(UpstreamAnswer {
                status: AnswerStatus::NoError,
                addresses: Vec::new(),
                ttl: None,
                raw: Bytes::new(),
            }),
        }
    }
}
