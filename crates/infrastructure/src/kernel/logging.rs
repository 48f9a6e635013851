use async_trait::async_trait;
use bgp_dns_application::ports::KernelRouteTable;
use bgp_dns_domain::{DomainError, RouteKey, RouteSpec};
use tracing::info;

/// Route table that only logs. Used when kernel injection is disabled or
/// the platform has no rtnetlink.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRouteTable;

impl LoggingRouteTable {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KernelRouteTable for LoggingRouteTable {
    async fn add(&self, route: &RouteSpec) -> Result<(), DomainError> {
        info!(route = %route, multipath = route.is_multipath(), "kernel route add (dry run)");
        Ok(())
    }

    async fn replace(&self, route: &RouteSpec) -> Result<(), DomainError> {
        info!(route = %route, multipath = route.is_multipath(), "kernel route replace (dry run)");
        Ok(())
    }

    async fn delete(&self, key: &RouteKey) -> Result<(), DomainError> {
        info!(route = %key, "kernel route delete (dry run)");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RouteSpec>, DomainError> {
        Ok(Vec::new())
    }
}
