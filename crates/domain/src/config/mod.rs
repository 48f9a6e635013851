//! Configuration module for bgp-dns
//!
//! - `root`: Main configuration and CLI overrides
//! - `dns`: Resolvers, refresh engine and domain list files
//! - `bgp`: Local speaker and neighbors
//! - `kernel`: Kernel route injection
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod bgp;
pub mod dns;
pub mod errors;
pub mod kernel;
pub mod logging;
pub mod root;

pub use bgp::{BgpConfig, PeerConfig};
pub use dns::{parse_resolver_addr, CacheConfig, DnsConfig, DomainListConfig};
pub use errors::ConfigError;
pub use kernel::KernelConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use root::{CliOverrides, Config};
