use crate::dns::forwarding::{MessageBuilder, ResponseParser};
use crate::dns::load_balancer::ResolverPool;
use bgp_dns_application::services::CacheMailbox;
use bgp_dns_domain::{DomainError, Fqdn};
use hickory_proto::op::MessageType;
use hickory_proto::rr::RecordType;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const MAX_QUERY_SIZE: usize = 4096;

/// UDP front end for clients.
///
/// A queries for listed names and their subdomains are answered from the
/// cache. Everything else is forwarded to the proxy pool unchanged.
pub struct DnsResponder {
    cache: CacheMailbox,
    proxy: Arc<ResolverPool>,
}

impl DnsResponder {
    pub fn new(cache: CacheMailbox, proxy: Arc<ResolverPool>) -> Self {
        Self { cache, proxy }
    }

    /// Bind the listening socket with address and port reuse enabled.
    pub fn bind(addr: SocketAddr) -> Result<UdpSocket, DomainError> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(any(target_os = "linux", target_os = "android", target_os = "macos"))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        Ok(UdpSocket::from_std(std_socket)?)
    }

    /// Receive loop. Each datagram is answered on its own task.
    pub async fn serve(
        self: Arc<Self>,
        socket: UdpSocket,
        shutdown: CancellationToken,
    ) -> Result<(), DomainError> {
        let socket = Arc::new(socket);
        let local = socket.local_addr()?;
        info!(bind_address = %local, protocol = "UDP", "DNS responder listening");

        let mut buf = vec![0u8; MAX_QUERY_SIZE];
        loop {
            let (len, client) = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("DNS responder: shutting down");
                    return Ok(());
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "DNS responder: receive failed");
                        continue;
                    }
                },
            };

            let packet = buf[..len].to_vec();
            let responder = Arc::clone(&self);
            let socket = Arc::clone(&socket);
            tokio::spawn(async move {
                if let Some(reply) = responder.handle_packet(&packet).await {
                    if let Err(e) = socket.send_to(&reply, client).await {
                        warn!(client = %client, error = %e, "DNS responder: send failed");
                    }
                }
            });
        }
    }

    /// Build the reply for one client datagram, `None` when nothing is sent.
    pub async fn handle_packet(&self, packet: &[u8]) -> Option<Vec<u8>> {
        let request = match ResponseParser::decode(packet) {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "DNS responder: dropping undecodable packet");
                return None;
            }
        };

        if request.message_type() != MessageType::Query {
            return None;
        }

        let a_query = match request.queries() {
            [q] if q.query_type() == RecordType::A => Fqdn::new(&q.name().to_ascii()).ok(),
            _ => None,
        };

        if let Some(name) = a_query {
            match self.cache.lookup(name.clone()).await {
                Ok(Some(answer)) => {
                    if let Some(raw) = answer.raw {
                        debug!(fqdn = %name, ttl = answer.remaining_ttl, "Answering from cache");
                        match MessageBuilder::build_cached_reply(&request, &raw, answer.remaining_ttl) {
                            Ok(reply) => return Some(reply),
                            Err(e) => warn!(fqdn = %name, error = %e, "Cached response unusable, proxying"),
                        }
                    } else {
                        debug!(fqdn = %name, "No cached response, proxying");
                    }
                }
                Ok(None) => debug!(fqdn = %name, "Name not listed, proxying"),
                Err(e) => warn!(fqdn = %name, error = %e, "Cache lookup failed, proxying"),
            }
        }

        self.proxy(packet).await
    }

    async fn proxy(&self, packet: &[u8]) -> Option<Vec<u8>> {
        match self.proxy.query_bytes(packet).await {
            Ok(reply) => Some(reply.raw.to_vec()),
            Err(e) => {
                warn!(pool = self.proxy.name(), error = %e, "Proxy query failed");
                None
            }
        }
    }
}
