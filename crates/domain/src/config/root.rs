use super::bgp::BgpConfig;
use super::dns::{parse_resolver_addr, DnsConfig};
use super::errors::ConfigError;
use super::kernel::KernelConfig;
use super::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "bgp-dns.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub bgp: BgpConfig,

    #[serde(default)]
    pub kernel: KernelConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dns_listen: Option<SocketAddr>,
    pub log_level: Option<String>,
}

impl Config {
    /// Loads `path`, or `bgp-dns.toml` from the working directory when no
    /// path is given and that file exists, otherwise the built-in defaults.
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        if let Some(listen) = overrides.dns_listen {
            config.dns.listen = listen;
        }
        if let Some(level) = overrides.log_level {
            config.logging.level = level;
        }

        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns.resolvers.is_empty() {
            return Err(ConfigError::Validation(
                "dns.resolvers must list at least one resolver".into(),
            ));
        }
        for raw in self.dns.resolvers.iter().chain(&self.dns.default_resolvers) {
            if parse_resolver_addr(raw).is_none() {
                return Err(ConfigError::Validation(format!(
                    "invalid resolver address '{}'",
                    raw
                )));
            }
        }
        if self.dns.query_timeout == 0 {
            return Err(ConfigError::Validation(
                "dns.query_timeout must be greater than zero".into(),
            ));
        }

        let cache = &self.dns.cache;
        if cache.ttl_floor == 0 {
            return Err(ConfigError::Validation(
                "dns.cache.ttl_floor must be greater than zero".into(),
            ));
        }
        if cache.default_ttl == 0 {
            return Err(ConfigError::Validation(
                "dns.cache.default_ttl must be greater than zero".into(),
            ));
        }
        if cache.ttl_jitter > cache.ttl_floor {
            return Err(ConfigError::Validation(format!(
                "dns.cache.ttl_jitter ({}) must not exceed dns.cache.ttl_floor ({})",
                cache.ttl_jitter, cache.ttl_floor
            )));
        }
        if cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "dns.cache.max_entries must be greater than zero".into(),
            ));
        }

        if self.bgp.asn == 0 {
            return Err(ConfigError::Validation("bgp.asn must be set".into()));
        }
        if self.bgp.router_id.is_unspecified() {
            return Err(ConfigError::Validation("bgp.router_id must be set".into()));
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::Validation(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}
