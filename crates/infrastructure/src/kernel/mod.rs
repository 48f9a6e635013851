//! Kernel forwarding table backends.
//!
//! On Linux routes go through rtnetlink. Elsewhere, or with injection
//! disabled, a logging table stands in.

pub mod logging;
#[cfg(target_os = "linux")]
pub mod netlink;
#[cfg(target_os = "linux")]
pub mod route_table;

pub use logging::LoggingRouteTable;
#[cfg(target_os = "linux")]
pub use route_table::NetlinkRouteTable;

use bgp_dns_application::ports::KernelRouteTable;
use bgp_dns_domain::config::KernelConfig;
use bgp_dns_domain::DomainError;
use std::sync::Arc;

/// The route table selected by `[kernel]`.
#[cfg(target_os = "linux")]
pub fn open_route_table(config: &KernelConfig) -> Result<Arc<dyn KernelRouteTable>, DomainError> {
    if !config.enabled {
        return Ok(Arc::new(LoggingRouteTable::new()));
    }
    Ok(Arc::new(NetlinkRouteTable::new(config.protocol, config.metric)?))
}

/// The route table selected by `[kernel]`.
#[cfg(not(target_os = "linux"))]
pub fn open_route_table(config: &KernelConfig) -> Result<Arc<dyn KernelRouteTable>, DomainError> {
    if !config.enabled {
        return Ok(Arc::new(LoggingRouteTable::new()));
    }
    Err(DomainError::UnsupportedPlatform(format!(
        "kernel route injection needs rtnetlink, not available on {}",
        std::env::consts::OS
    )))
}
