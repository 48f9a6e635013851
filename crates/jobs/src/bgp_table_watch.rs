use bgp_dns_application::ports::BgpSpeaker;
use bgp_dns_application::services::KernelMailbox;
use bgp_dns_domain::{BgpPath, Community, DomainError};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Feeds community-tagged IPv4 best paths into the kernel reconciler.
pub struct BgpTableWatchJob {
    speaker: Arc<dyn BgpSpeaker>,
    kernel: KernelMailbox,
    inject: Vec<Community>,
    metric: u32,
    shutdown: CancellationToken,
}

impl BgpTableWatchJob {
    pub fn new(
        speaker: Arc<dyn BgpSpeaker>,
        kernel: KernelMailbox,
        inject: Vec<Community>,
        metric: u32,
    ) -> Self {
        Self {
            speaker,
            kernel,
            inject,
            metric,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// A path is injected when it carries any of the configured communities.
    pub fn matches(&self, path: &BgpPath) -> bool {
        match path.communities.as_deref() {
            Some(list) => list.iter().any(|c| self.inject.contains(c)),
            None => false,
        }
    }

    pub async fn apply(&self, paths: Vec<BgpPath>) -> Result<(), DomainError> {
        for path in paths {
            let (Some(prefix), Some(next_hop)) = (path.ipv4_prefix(), path.ipv4_next_hop()) else {
                debug!(path = %path, "Skipping non-IPv4 path");
                continue;
            };
            if !self.matches(&path) {
                debug!(path = %path, "No inject community, skipping");
                continue;
            }

            if path.is_withdraw {
                self.kernel.withdraw(prefix, next_hop, self.metric).await?;
            } else {
                self.kernel.advance(prefix, next_hop, self.metric).await?;
            }
        }
        Ok(())
    }

    /// Spawns the loop; the handle resolves once it has exited.
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            communities = self.inject.len(),
            metric = self.metric,
            "Starting BGP table watch job"
        );

        let mut events = self.speaker.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("BgpTableWatchJob: shutting down");
                        break;
                    }
                    event = events.recv() => match event {
                        Ok(paths) => {
                            if let Err(e) = self.apply(paths).await {
                                info!(error = %e, "BgpTableWatchJob: kernel reconciler gone");
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "BGP event stream lagged, some path changes were missed");
                        }
                        Err(RecvError::Closed) => {
                            info!("BgpTableWatchJob: event stream closed");
                            break;
                        }
                    },
                }
            }
        })
    }
}
