use async_trait::async_trait;
use bgp_dns_domain::{DomainError, Fqdn, UpstreamAnswer};

/// Upstream resolution of A records for tracked names.
///
/// Implementations fail over between resolvers on their own; an `Err` means
/// every resolver was tried. NXDOMAIN and other response codes are reported
/// through [`UpstreamAnswer::status`], not as errors.
#[async_trait]
pub trait DnsUpstream: Send + Sync {
    async fn resolve_a(&self, name: &Fqdn) -> Result<UpstreamAnswer, DomainError>;
}
