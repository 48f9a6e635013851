use super::{TransportResponse, UpstreamTransport};
use async_trait::async_trait;
use bgp_dns_domain::DomainError;
use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// DNS over UDP, one ephemeral socket per exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(
        server: SocketAddr,
        message_bytes: &[u8],
    ) -> Result<TransportResponse, DomainError> {
        let bind_addr: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| network_error("bind", server, e))?;

        let bytes_sent = socket
            .send_to(message_bytes, server)
            .await
            .map_err(|e| network_error("send", server, e))?;

        debug!(server = %server, bytes_sent = bytes_sent, "UDP query sent");

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        loop {
            let (bytes_received, from_addr) = socket
                .recv_from(&mut recv_buf)
                .await
                .map_err(|e| network_error("recv", server, e))?;

            if from_addr != server {
                warn!(
                    expected = %server,
                    received_from = %from_addr,
                    "UDP response from unexpected source, ignoring"
                );
                continue;
            }

            recv_buf.truncate(bytes_received);
            debug!(server = %server, bytes_received = bytes_received, "UDP response received");

            return Ok(TransportResponse {
                bytes: Bytes::from(recv_buf),
                protocol_used: "UDP",
            });
        }
    }
}

fn network_error(op: &'static str, server: SocketAddr, e: std::io::Error) -> DomainError {
    DomainError::TransportNetwork {
        op,
        server,
        reason: e.to_string(),
    }
}

#[async_trait]
impl UpstreamTransport for UdpTransport {
    async fn send(
        &self,
        server: SocketAddr,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        tokio::time::timeout(timeout, Self::exchange(server, message_bytes))
            .await
            .map_err(|_| DomainError::TransportTimeout { server })?
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
