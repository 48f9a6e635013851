use crate::{BgpTableWatchJob, DomainListWatchJob};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Running background jobs, joined together at shutdown.
pub struct RunningJobs {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningJobs {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every job loop to exit. Cancel the jobs' tokens first.
    pub async fn join(self) {
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(job = name, error = %e, "Background job panicked");
            }
        }
        info!("All background jobs stopped");
    }
}

/// Starts the list watcher and the BGP table watcher.
///
/// ```rust,ignore
/// let jobs = JobRunner::new()
///     .with_domain_list_watch(DomainListWatchJob::new(cache, files))
///     .with_bgp_table_watch(BgpTableWatchJob::new(speaker, kernel, communities, 100))
///     .start()
///     .await;
/// shutdown.cancel();
/// jobs.join().await;
/// ```
#[derive(Default)]
pub struct JobRunner {
    domain_list_watch: Option<DomainListWatchJob>,
    bgp_table_watch: Option<BgpTableWatchJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain_list_watch(mut self, job: DomainListWatchJob) -> Self {
        self.domain_list_watch = Some(job);
        self
    }

    pub fn with_bgp_table_watch(mut self, job: BgpTableWatchJob) -> Self {
        self.bgp_table_watch = Some(job);
        self
    }

    /// The BGP table watcher subscribes before this returns, so no event
    /// published afterwards is missed.
    pub async fn start(self) -> RunningJobs {
        let mut handles = Vec::new();

        if let Some(job) = self.bgp_table_watch {
            handles.push(("bgp-table-watch", Arc::new(job).start().await));
        }
        if let Some(job) = self.domain_list_watch {
            handles.push(("domain-list-watch", Arc::new(job).start().await));
        }

        info!(jobs = handles.len(), "Background jobs started");
        RunningJobs { handles }
    }
}
