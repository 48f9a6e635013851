pub mod udp;

use async_trait::async_trait;
use bgp_dns_domain::DomainError;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;

/// Result of a raw DNS transport operation
#[derive(Debug)]
pub struct TransportResponse {
    /// Raw DNS response bytes (wire format)
    pub bytes: Bytes,
    /// Which protocol was used
    pub protocol_used: &'static str,
}

/// Sends one raw DNS message to one server and returns its reply.
///
/// Implementations map every failure to `TransportTimeout`, `TransportNetwork`
/// or `UnexpectedResponse` so the pool can move on to the next server.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(
        &self,
        server: SocketAddr,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError>;

    fn protocol_name(&self) -> &'static str;
}

pub use udp::UdpTransport;
