use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// DNS resolution and responder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// UDP address the responder listens on (default: "127.0.0.1:5353")
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Resolvers used for tracked names, tried in rotation.
    /// Entries without a port default to 53.
    #[serde(default)]
    pub resolvers: Vec<String>,

    /// Resolvers for proxied queries of untracked names.
    /// Empty means "use `resolvers`".
    #[serde(default)]
    pub default_resolvers: Vec<String>,

    /// Per-attempt upstream timeout in milliseconds (default: 2000)
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub list: DomainListConfig,
}

/// Refresh engine tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum tracked names before the least used one is evicted (default: 10000)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Shortest sleep between refresh passes, in seconds (default: 5)
    #[serde(default = "default_min_ttl")]
    pub min_ttl: u64,

    /// Answers with a TTL below this many seconds are clamped up to it (default: 60)
    #[serde(default = "default_ttl_floor")]
    pub ttl_floor: u32,

    /// Clamped TTLs are reduced by a random jitter below this bound (default: 10)
    #[serde(default = "default_ttl_jitter")]
    pub ttl_jitter: u32,

    /// TTL for empty answers and names not yet resolved, in seconds (default: 30)
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
}

/// Domain list files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainListConfig {
    /// One name per line, `#` and `;` comments allowed
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Seconds between modification checks (default: 5)
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl DnsConfig {
    /// Resolvers for proxied queries, falling back to the tracked-name pool.
    pub fn proxy_resolvers(&self) -> &[String] {
        if self.default_resolvers.is_empty() {
            &self.resolvers
        } else {
            &self.default_resolvers
        }
    }
}

/// Parses `ip` or `ip:port`, defaulting the port to 53.
pub fn parse_resolver_addr(raw: &str) -> Option<SocketAddr> {
    let raw = raw.trim();
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr);
    }
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<std::net::IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, 53))
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            resolvers: Vec::new(),
            default_resolvers: Vec::new(),
            query_timeout: default_query_timeout(),
            cache: CacheConfig::default(),
            list: DomainListConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            min_ttl: default_min_ttl(),
            ttl_floor: default_ttl_floor(),
            ttl_jitter: default_ttl_jitter(),
            default_ttl: default_ttl(),
        }
    }
}

impl Default for DomainListConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5353))
}

fn default_query_timeout() -> u64 {
    2000
}

fn default_max_entries() -> usize {
    10_000
}

fn default_min_ttl() -> u64 {
    5
}

fn default_ttl_floor() -> u32 {
    60
}

fn default_ttl_jitter() -> u32 {
    10
}

fn default_ttl() -> u32 {
    30
}

fn default_poll_interval() -> u64 {
    5
}
