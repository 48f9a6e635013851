use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid community: {0}")]
    InvalidCommunity(String),

    #[error("Invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Query to {server} timed out")]
    TransportTimeout { server: SocketAddr },

    #[error("{op} {server}: {reason}")]
    TransportNetwork {
        op: &'static str,
        server: SocketAddr,
        reason: String,
    },

    #[error("Unexpected response from {server}: {reason}")]
    UnexpectedResponse { server: SocketAddr, reason: String },

    #[error("All {attempts} upstream resolvers failed, last error: {last}")]
    AllUpstreamsFailed {
        attempts: usize,
        last: Box<DomainError>,
    },

    #[error("No upstream resolvers configured")]
    NoUpstreams,

    #[error("Actor '{0}' has stopped")]
    ActorStopped(&'static str),

    #[error("BGP engine error: {0}")]
    BgpEngine(String),

    #[error("Kernel route already exists: {0}")]
    KernelRouteExists(String),

    #[error("Kernel route error: {0}")]
    KernelRoute(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DomainError {
    /// Transport failures are retried on the next resolver in the rotation.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            DomainError::TransportTimeout { .. }
                | DomainError::TransportNetwork { .. }
                | DomainError::UnexpectedResponse { .. }
                | DomainError::IoError(_)
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
