use crate::dns::forwarding::{MessageBuilder, ResponseParser};
use crate::dns::transport::UpstreamTransport;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use bgp_dns_application::ports::DnsUpstream;
use bgp_dns_domain::config::parse_resolver_addr;
use bgp_dns_domain::{DomainError, Fqdn, UpstreamAnswer};
use bytes::Bytes;
use hickory_proto::op::{Message, MessageType};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

struct Upstream {
    addr: SocketAddr,
    healthy: AtomicBool,
}

/// One generation of the server list. Replaced wholesale by `set_servers`.
struct Rotation {
    servers: Vec<Upstream>,
    cursor: AtomicUsize,
}

impl Rotation {
    fn new(servers: Vec<SocketAddr>) -> Self {
        Self {
            servers: servers
                .into_iter()
                .map(|addr| Upstream {
                    addr,
                    healthy: AtomicBool::new(true),
                })
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

/// Advisory health of one resolver, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamHealth {
    pub server: SocketAddr,
    pub healthy: bool,
}

/// Decoded reply together with the server that produced it.
#[derive(Debug, Clone)]
pub struct PoolReply {
    pub server: SocketAddr,
    pub message: Message,
    pub raw: Bytes,
}

/// Ordered resolver list with failover.
///
/// A query starts at the cursor and walks the list once. The cursor only
/// moves past servers that failed, so a healthy resolver keeps serving.
pub struct ResolverPool {
    name: &'static str,
    rotation: ArcSwap<Rotation>,
    transport: Arc<dyn UpstreamTransport>,
    timeout: Duration,
}

impl ResolverPool {
    pub fn new(
        name: &'static str,
        servers: Vec<SocketAddr>,
        transport: Arc<dyn UpstreamTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            rotation: ArcSwap::from_pointee(Rotation::new(servers)),
            transport,
            timeout,
        }
    }

    /// Build a pool from resolver strings (`ip` or `ip:port`).
    pub fn from_config(
        name: &'static str,
        resolvers: &[String],
        transport: Arc<dyn UpstreamTransport>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let servers = resolvers
            .iter()
            .map(|raw| {
                parse_resolver_addr(raw)
                    .ok_or_else(|| DomainError::InvalidIpAddress(format!("resolver '{}'", raw)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, servers, transport, timeout))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Swap in a new server list. Cursor and health start over.
    pub fn set_servers(&self, servers: Vec<SocketAddr>) {
        debug!(pool = self.name, servers = servers.len(), "Replacing resolver list");
        self.rotation.store(Arc::new(Rotation::new(servers)));
    }

    pub fn servers(&self) -> Vec<SocketAddr> {
        self.rotation.load().servers.iter().map(|s| s.addr).collect()
    }

    pub fn cursor(&self) -> usize {
        self.rotation.load().cursor.load(Ordering::Relaxed)
    }

    pub fn health(&self) -> Vec<UpstreamHealth> {
        self.rotation
            .load()
            .servers
            .iter()
            .map(|s| UpstreamHealth {
                server: s.addr,
                healthy: s.healthy.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Send a prepared query message through the rotation.
    pub async fn query(&self, request: &Message) -> Result<PoolReply, DomainError> {
        let bytes = MessageBuilder::serialize_message(request)?;
        self.exchange(&bytes, request.id()).await
    }

    /// Forward a client's raw query. The message ID is left untouched.
    pub async fn query_bytes(&self, raw: &[u8]) -> Result<PoolReply, DomainError> {
        if raw.len() < 12 {
            return Err(DomainError::InvalidDnsResponse(format!(
                "query too short ({} bytes)",
                raw.len()
            )));
        }
        let id = u16::from_be_bytes([raw[0], raw[1]]);
        self.exchange(raw, id).await
    }

    async fn exchange(&self, request: &[u8], id: u16) -> Result<PoolReply, DomainError> {
        let rotation = self.rotation.load_full();
        let count = rotation.servers.len();
        if count == 0 {
            return Err(DomainError::NoUpstreams);
        }

        let start = rotation.cursor.load(Ordering::Relaxed) % count;
        let mut last = None;

        for step in 0..count {
            let idx = (start + step) % count;
            let upstream = &rotation.servers[idx];

            match self.attempt(upstream.addr, request, id).await {
                Ok(reply) => {
                    upstream.healthy.store(true, Ordering::Relaxed);
                    rotation.cursor.store(idx, Ordering::Relaxed);
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(
                        pool = self.name,
                        server = %upstream.addr,
                        protocol = self.transport.protocol_name(),
                        error = %e,
                        "Upstream attempt failed, rotating"
                    );
                    upstream.healthy.store(false, Ordering::Relaxed);
                    rotation.cursor.store((idx + 1) % count, Ordering::Relaxed);
                    last = Some(e);
                }
            }
        }

        Err(DomainError::AllUpstreamsFailed {
            attempts: count,
            last: Box::new(last.unwrap_or(DomainError::NoUpstreams)),
        })
    }

    async fn attempt(
        &self,
        server: SocketAddr,
        request: &[u8],
        id: u16,
    ) -> Result<PoolReply, DomainError> {
        let response = self.transport.send(server, request, self.timeout).await?;

        let unexpected = |reason: String| DomainError::UnexpectedResponse { server, reason };

        let message = ResponseParser::decode(&response.bytes).map_err(|e| unexpected(e.to_string()))?;
        if message.id() != id {
            return Err(unexpected(format!("id {} does not match query id {}", message.id(), id)));
        }
        if message.message_type() != MessageType::Response {
            return Err(unexpected("reply is not a response".to_string()));
        }
        if ResponseParser::is_server_error(message.response_code()) {
            return Err(unexpected(format!("rcode {}", message.response_code())));
        }

        Ok(PoolReply {
            server,
            message,
            raw: response.bytes,
        })
    }
}

#[async_trait]
impl DnsUpstream for ResolverPool {
    async fn resolve_a(&self, name: &Fqdn) -> Result<UpstreamAnswer, DomainError> {
        let (id, bytes) = MessageBuilder::build_a_query(name)?;
        let reply = self.exchange(&bytes, id).await?;
        debug!(
            pool = self.name,
            fqdn = %name,
            server = %reply.server,
            rcode = %reply.message.response_code(),
            "Upstream answered"
        );
        Ok(ResponseParser::to_answer(&reply.message, reply.raw))
    }
}
