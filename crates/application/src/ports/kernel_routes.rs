use async_trait::async_trait;
use bgp_dns_domain::{DomainError, RouteKey, RouteSpec};

/// Kernel forwarding table, limited to routes this process manages.
///
/// `add` fails with [`DomainError::KernelRouteExists`] when the route is
/// already installed; `replace` installs or overwrites.
#[async_trait]
pub trait KernelRouteTable: Send + Sync {
    async fn add(&self, route: &RouteSpec) -> Result<(), DomainError>;

    async fn replace(&self, route: &RouteSpec) -> Result<(), DomainError>;

    async fn delete(&self, key: &RouteKey) -> Result<(), DomainError>;

    /// Routes carrying this process's protocol tag.
    async fn list(&self) -> Result<Vec<RouteSpec>, DomainError>;
}
