use bgp_dns_application::services::CacheMailbox;
use bgp_dns_domain::DomainError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Modification time per list file, `None` while a file is missing.
pub type FileStamps = Vec<Option<SystemTime>>;

/// Reloads the domain lists into the cache whenever one of them changes.
pub struct DomainListWatchJob {
    cache: CacheMailbox,
    files: Vec<PathBuf>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl DomainListWatchJob {
    pub fn new(cache: CacheMailbox, files: Vec<PathBuf>) -> Self {
        Self {
            cache,
            files,
            interval_secs: 5,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn stamps(&self) -> FileStamps {
        self.files
            .iter()
            .map(|f| std::fs::metadata(f).and_then(|m| m.modified()).ok())
            .collect()
    }

    /// Loads the lists if they changed since `seen`. Returns whether a load ran.
    ///
    /// `seen` only moves forward on a successful load, so a failed load is
    /// retried on the next poll.
    pub async fn poll(&self, seen: &mut Option<FileStamps>) -> Result<bool, DomainError> {
        let current = self.stamps();
        if seen.as_ref() == Some(&current) {
            return Ok(false);
        }

        debug!(files = self.files.len(), "Domain list change detected");
        self.cache.load(self.files.clone()).await?;
        *seen = Some(current);
        Ok(true)
    }

    /// Spawns the loop; the handle resolves once it has exited.
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            files = self.files.len(),
            interval_secs = self.interval_secs,
            "Starting domain list watch job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            let mut seen: Option<FileStamps> = None;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("DomainListWatchJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.poll(&mut seen).await {
                            Ok(true) => info!("Domain lists reloaded"),
                            Ok(false) => {}
                            Err(DomainError::ActorStopped(_)) => {
                                info!("DomainListWatchJob: cache stopped");
                                break;
                            }
                            Err(e) => error!(error = %e, "Domain list reload failed"),
                        }
                    }
                }
            }
        })
    }
}
