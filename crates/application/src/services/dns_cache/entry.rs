use bgp_dns_domain::Fqdn;
use bytes::Bytes;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::Instant;

/// State of one tracked name.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub name: Fqdn,
    /// Sorted and deduplicated.
    pub addresses: Vec<Ipv4Addr>,
    /// Last upstream response in wire format.
    pub raw: Option<Bytes>,
    pub ttl: u32,
    pub expires_at: Instant,
    /// Load generation that last referenced this name.
    pub generation: u64,
    /// Client lookups served, used for capacity eviction.
    pub hits: u64,
}

impl CacheEntry {
    /// New entries are due immediately.
    pub fn new(name: Fqdn, generation: u64, default_ttl: u32, now: Instant) -> Self {
        Self {
            name,
            addresses: Vec::new(),
            raw: None,
            ttl: default_ttl,
            expires_at: now,
            generation,
            hits: 0,
        }
    }

    pub fn arm(&mut self, ttl: u32, now: Instant) {
        self.ttl = ttl;
        self.expires_at = now + Duration::from_secs(ttl as u64);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    pub fn remaining_ttl(&self, now: Instant) -> u32 {
        self.expires_at.saturating_duration_since(now).as_secs() as u32
    }
}

/// What the DNS responder needs to answer a client from the cache.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub addresses: Vec<Ipv4Addr>,
    pub raw: Option<Bytes>,
    pub remaining_ttl: u32,
}
