use super::build_reply;
use async_trait::async_trait;
use bgp_dns_domain::DomainError;
use bgp_dns_infrastructure::dns::transport::{TransportResponse, UpstreamTransport};
use bytes::Bytes;
use hickory_proto::op::{Message, ResponseCode};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted server does with a query.
#[derive(Debug, Clone)]
pub enum Behavior {
    Timeout,
    Unreachable,
    Answer {
        rcode: ResponseCode,
        ips: Vec<Ipv4Addr>,
        ttl: u32,
    },
    WrongId,
    Garbage,
}

impl Behavior {
    pub fn answer(ips: &[&str], ttl: u32) -> Self {
        Behavior::Answer {
            rcode: ResponseCode::NoError,
            ips: ips.iter().map(|s| s.parse().unwrap()).collect(),
            ttl,
        }
    }

    pub fn rcode(rcode: ResponseCode) -> Self {
        Behavior::Answer {
            rcode,
            ips: Vec::new(),
            ttl: 0,
        }
    }
}

/// Transport that answers from a per-server script and records every attempt.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<HashMap<SocketAddr, Behavior>>>,
    attempts: Arc<Mutex<Vec<SocketAddr>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, server: SocketAddr, behavior: Behavior) -> Self {
        self.set(server, behavior);
        self
    }

    pub fn set(&self, server: SocketAddr, behavior: Behavior) {
        self.script.lock().unwrap().insert(server, behavior);
    }

    pub fn attempts(&self) -> Vec<SocketAddr> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn clear_attempts(&self) {
        self.attempts.lock().unwrap().clear();
    }
}

#[async_trait]
impl UpstreamTransport for ScriptedTransport {
    async fn send(
        &self,
        server: SocketAddr,
        message_bytes: &[u8],
        _timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        self.attempts.lock().unwrap().push(server);
        let behavior = self
            .script
            .lock()
            .unwrap()
            .get(&server)
            .cloned()
            .unwrap_or(Behavior::Unreachable);
        let query = Message::from_vec(message_bytes).unwrap();

        let bytes = match behavior {
            Behavior::Timeout => return Err(DomainError::TransportTimeout { server }),
            Behavior::Unreachable => {
                return Err(DomainError::TransportNetwork {
                    op: "send",
                    server,
                    reason: "connection refused".to_string(),
                })
            }
            Behavior::Answer { rcode, ips, ttl } => build_reply(&query, rcode, &ips, ttl),
            Behavior::WrongId => {
                let mut bytes = build_reply(&query, ResponseCode::NoError, &[], 0);
                let wrong = query.id().wrapping_add(1).to_be_bytes();
                bytes[..2].copy_from_slice(&wrong);
                bytes
            }
            Behavior::Garbage => vec![0xde, 0xad],
        };

        Ok(TransportResponse {
            bytes: Bytes::from(bytes),
            protocol_used: "SCRIPTED",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "SCRIPTED"
    }
}
