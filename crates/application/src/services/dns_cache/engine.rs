use super::entry::{CacheEntry, CachedAnswer};
use super::ttl::TtlPolicy;
use crate::actor::{Handler, Mailbox};
use crate::ports::DnsUpstream;
use crate::services::route_refcount::RefCountMailbox;
use async_trait::async_trait;
use bgp_dns_domain::config::CacheConfig;
use bgp_dns_domain::{read_domain_list, AnswerStatus, DomainError, Fqdn, UpstreamAnswer};
use rustc_hash::{FxHashMap, FxHashSet};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub enum CacheCommand {
    /// Lists the name, making it and its subdomains answerable.
    Add(Fqdn),
    /// Drops the name and every tracked subdomain of it.
    Remove(Fqdn),
    Clear,
    Load(Vec<PathBuf>),
    /// Serves a client query for a listed name or a subdomain of one.
    Lookup {
        name: Fqdn,
        reply: oneshot::Sender<Option<CachedAnswer>>,
    },
    Snapshot(oneshot::Sender<Vec<CacheEntry>>),
}

pub type CacheMailbox = Mailbox<CacheCommand>;

/// Resolves tracked names, re-resolves them when their TTL runs out and
/// forwards every address change to the route reference counter.
///
/// Only names added or loaded from a list, and subdomains of them, are ever
/// tracked. Client queries for anything else are left to the proxy.
pub struct DnsCacheEngine {
    upstream: Arc<dyn DnsUpstream>,
    routes: RefCountMailbox,
    policy: TtlPolicy,
    min_sleep: Duration,
    max_entries: usize,
    entries: FxHashMap<Fqdn, CacheEntry>,
    listed: FxHashSet<Fqdn>,
    generation: u64,
    last_pass: Instant,
}

enum Outcome {
    Updated { ttl: u32, addresses: Vec<Ipv4Addr> },
    Empty,
    NotFound,
    Unchanged,
}

impl DnsCacheEngine {
    pub fn new(upstream: Arc<dyn DnsUpstream>, routes: RefCountMailbox, config: &CacheConfig) -> Self {
        Self {
            upstream,
            routes,
            policy: TtlPolicy::from_config(config),
            min_sleep: Duration::from_secs(config.min_ttl),
            max_entries: config.max_entries.max(1),
            entries: FxHashMap::default(),
            listed: FxHashSet::default(),
            generation: 0,
            last_pass: Instant::now(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &Fqdn) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// True when `name` or one of its parents was added or loaded.
    pub fn is_listed(&self, name: &Fqdn) -> bool {
        name.suffixes().any(|suffix| self.listed.contains(suffix))
    }

    /// Lists `name` and tracks it.
    pub async fn add(&mut self, name: Fqdn) {
        self.listed.insert(name.clone());
        self.track(name).await;
    }

    /// Tracks `name` with the current generation and resolves it right away.
    /// A name already tracked only has its generation refreshed.
    async fn track(&mut self, name: Fqdn) {
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.generation = self.generation;
            return;
        }

        if self.entries.len() >= self.max_entries {
            self.evict_least_used().await;
        }

        debug!(name = %name, generation = self.generation, "Tracking name");
        let entry = CacheEntry::new(
            name.clone(),
            self.generation,
            self.policy.default_ttl,
            Instant::now(),
        );
        self.entries.insert(name.clone(), entry);
        self.resolve(&name).await;
    }

    /// Re-resolves one tracked name and applies the answer.
    pub async fn resolve(&mut self, name: &Fqdn) {
        let answer = self.upstream.resolve_a(name).await;
        let now = Instant::now();

        let outcome = match answer {
            Ok(answer) => self.classify(name, answer),
            Err(e) => {
                warn!(name = %name, error = %e, "Resolution failed, keeping previous answer");
                Outcome::Unchanged
            }
        };

        match outcome {
            Outcome::NotFound => {
                info!(name = %name, "Name no longer exists, dropping it");
                self.drop_entry(name).await;
            }
            Outcome::Unchanged => {
                if let Some(entry) = self.entries.get_mut(name) {
                    let ttl = entry.ttl;
                    entry.arm(ttl, now);
                }
            }
            Outcome::Empty => {
                let ttl = self.policy.default_ttl;
                if let Some(entry) = self.entries.get_mut(name) {
                    entry.arm(ttl, now);
                }
            }
            Outcome::Updated { ttl, addresses } => {
                self.upsert(name, addresses).await;
                if let Some(entry) = self.entries.get_mut(name) {
                    entry.arm(ttl, now);
                    debug!(name = %name, ttl, addresses = entry.addresses.len(), "Name resolved");
                }
            }
        }
    }

    fn classify(&mut self, name: &Fqdn, answer: UpstreamAnswer) -> Outcome {
        match answer.status {
            AnswerStatus::NxDomain => Outcome::NotFound,
            AnswerStatus::Failure { rcode } => {
                warn!(name = %name, rcode, "Upstream returned an error code, keeping previous answer");
                Outcome::Unchanged
            }
            AnswerStatus::NoError if answer.addresses.is_empty() => {
                if let Some(entry) = self.entries.get_mut(name) {
                    if entry.raw.is_none() {
                        entry.raw = Some(answer.raw);
                    }
                }
                Outcome::Empty
            }
            AnswerStatus::NoError => {
                let ttl = self.policy.effective(answer.ttl.unwrap_or(0));
                if let Some(entry) = self.entries.get_mut(name) {
                    entry.raw = Some(answer.raw);
                }
                Outcome::Updated {
                    ttl,
                    addresses: answer.addresses,
                }
            }
        }
    }

    /// Replaces the address set of `name`, advancing added addresses and
    /// withdrawing removed ones.
    async fn upsert(&mut self, name: &Fqdn, mut addresses: Vec<Ipv4Addr>) {
        addresses.sort_unstable();
        addresses.dedup();

        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };

        let removed: Vec<Ipv4Addr> = entry
            .addresses
            .iter()
            .filter(|ip| addresses.binary_search(ip).is_err())
            .copied()
            .collect();
        let added: Vec<Ipv4Addr> = addresses
            .iter()
            .filter(|ip| entry.addresses.binary_search(ip).is_err())
            .copied()
            .collect();
        entry.addresses = addresses;

        if !removed.is_empty() {
            debug!(name = %name, removed = ?removed, "Addresses gone");
            if let Err(e) = self.routes.withdraw(removed).await {
                warn!(name = %name, error = %e, "Could not withdraw routes");
            }
        }
        if !added.is_empty() {
            debug!(name = %name, added = ?added, "Addresses arrived");
            if let Err(e) = self.routes.advance(added).await {
                warn!(name = %name, error = %e, "Could not announce routes");
            }
        }
    }

    async fn drop_entry(&mut self, name: &Fqdn) {
        if let Some(entry) = self.entries.remove(name) {
            if entry.addresses.is_empty() {
                return;
            }
            if let Err(e) = self.routes.withdraw(entry.addresses).await {
                warn!(name = %name, error = %e, "Could not withdraw routes");
            }
        }
    }

    /// Unlists and drops `name` and every name below it.
    pub async fn remove(&mut self, name: &Fqdn) -> usize {
        self.listed.retain(|listed| !listed.ends_with(name));
        let doomed: Vec<Fqdn> = self
            .entries
            .keys()
            .filter(|n| n.ends_with(name))
            .cloned()
            .collect();
        for n in &doomed {
            self.drop_entry(n).await;
        }
        info!(name = %name, removed = doomed.len(), "Names removed");
        doomed.len()
    }

    pub async fn clear(&mut self) {
        self.listed.clear();
        let names: Vec<Fqdn> = self.entries.keys().cloned().collect();
        for n in &names {
            self.drop_entry(n).await;
        }
        info!(removed = names.len(), "Cache cleared");
    }

    /// Starts a new generation, tracks every listed name and evicts names no
    /// longer covered by the list. Nothing changes when a file cannot be read.
    pub async fn load(&mut self, files: &[PathBuf]) -> Result<(), DomainError> {
        let mut names = Vec::new();
        for file in files {
            names.extend(read_domain_list(file)?);
        }

        self.generation += 1;
        let generation = self.generation;
        self.listed = names.iter().cloned().collect();
        for name in names {
            self.track(name).await;
        }

        let stale: Vec<Fqdn> = self
            .entries
            .values()
            .filter(|e| e.generation < generation && !self.is_listed(&e.name))
            .map(|e| e.name.clone())
            .collect();
        for name in &stale {
            debug!(name = %name, "Evicting name missing from the list");
            self.drop_entry(name).await;
        }

        info!(
            generation,
            files = files.len(),
            tracked = self.entries.len(),
            evicted = stale.len(),
            "Domain list loaded"
        );
        Ok(())
    }

    /// Answers a client query. Subdomains of listed names are tracked on
    /// first use; names outside the list get `None`.
    pub async fn lookup(&mut self, name: Fqdn) -> Option<CachedAnswer> {
        if !self.entries.contains_key(&name) {
            if !self.is_listed(&name) {
                return None;
            }
            self.track(name.clone()).await;
        }

        let now = Instant::now();
        let entry = self.entries.get_mut(&name)?;
        entry.hits += 1;
        Some(CachedAnswer {
            addresses: entry.addresses.clone(),
            raw: entry.raw.clone(),
            remaining_ttl: entry.remaining_ttl(now),
        })
    }

    async fn evict_least_used(&mut self) {
        let victim = self
            .entries
            .values()
            .min_by_key(|e| (e.hits, e.expires_at))
            .map(|e| e.name.clone());

        if let Some(name) = victim {
            info!(name = %name, max_entries = self.max_entries, "Cache full, evicting least used name");
            self.drop_entry(&name).await;
        }
    }

    /// Re-resolves every name whose TTL has run out.
    pub async fn refresh_due(&mut self) {
        let now = Instant::now();
        self.last_pass = now;

        let due: Vec<Fqdn> = self
            .entries
            .values()
            .filter(|e| e.is_due(now))
            .map(|e| e.name.clone())
            .collect();
        if due.is_empty() {
            return;
        }

        debug!(due = due.len(), "Refreshing expired names");
        for name in &due {
            self.resolve(name).await;
        }
    }

    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

#[async_trait]
impl Handler for DnsCacheEngine {
    type Message = CacheCommand;

    async fn handle(&mut self, message: CacheCommand) -> Result<(), DomainError> {
        match message {
            CacheCommand::Add(name) => self.add(name).await,
            CacheCommand::Remove(name) => {
                self.remove(&name).await;
            }
            CacheCommand::Clear => self.clear().await,
            CacheCommand::Load(files) => return self.load(&files).await,
            CacheCommand::Lookup { name, reply } => {
                let answer = self.lookup(name).await;
                let _ = reply.send(answer);
            }
            CacheCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
        Ok(())
    }

    /// Soonest expiry, never earlier than `min_ttl` after the previous pass.
    /// With nothing tracked the engine idles for `default_ttl`.
    fn next_deadline(&self) -> Option<Instant> {
        let earliest = self.last_pass + self.min_sleep;
        let next = match self.entries.values().map(|e| e.expires_at).min() {
            Some(expiry) => expiry,
            None => self.last_pass + Duration::from_secs(self.policy.default_ttl as u64),
        };
        Some(next.max(earliest))
    }

    async fn on_deadline(&mut self) {
        self.refresh_due().await;
    }

    async fn on_stop(&mut self) {
        info!(tracked = self.entries.len(), "DNS cache stopped");
    }
}

impl Mailbox<CacheCommand> {
    pub async fn add(&self, name: Fqdn) -> Result<(), DomainError> {
        self.tell(CacheCommand::Add(name)).await
    }

    pub async fn remove(&self, name: Fqdn) -> Result<(), DomainError> {
        self.tell(CacheCommand::Remove(name)).await
    }

    pub async fn clear(&self) -> Result<(), DomainError> {
        self.tell(CacheCommand::Clear).await
    }

    /// Waits until the lists are applied.
    pub async fn load(&self, files: Vec<PathBuf>) -> Result<(), DomainError> {
        self.ask(CacheCommand::Load(files)).await
    }

    pub async fn lookup(&self, name: Fqdn) -> Result<Option<CachedAnswer>, DomainError> {
        let (reply, answer) = oneshot::channel();
        self.tell(CacheCommand::Lookup { name, reply }).await?;
        answer.await.map_err(|_| self.stopped())
    }

    pub async fn entries(&self) -> Result<Vec<CacheEntry>, DomainError> {
        let (reply, entries) = oneshot::channel();
        self.tell(CacheCommand::Snapshot(reply)).await?;
        entries.await.map_err(|_| self.stopped())
    }
}
