use super::MAILBOX_CAPACITY;
use bgp_dns_application::ports::{BgpSpeaker, KernelRouteTable};
use bgp_dns_application::services::{
    KernelMailbox, KernelReconciler, RefCountMailbox, RouteRefCounter,
};
use bgp_dns_application::{spawn, ActorHandle};
use bgp_dns_domain::{Config, DomainError};
use bgp_dns_infrastructure::kernel::{open_route_table, LoggingRouteTable};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Host route reference counting and kernel route injection.
pub struct RouteServices {
    pub refcount: RefCountMailbox,
    pub kernel: KernelMailbox,
    pub handles: Vec<ActorHandle>,
}

impl RouteServices {
    pub async fn start(
        config: &Config,
        speaker: Arc<dyn BgpSpeaker>,
        shutdown: &CancellationToken,
    ) -> anyhow::Result<Self> {
        let table = kernel_table(config)?;

        let (refcount, refcount_handle) = spawn(
            "route-refcount",
            RouteRefCounter::new(speaker, &config.bgp),
            MAILBOX_CAPACITY,
            shutdown.child_token(),
        );
        let (kernel, kernel_handle) = spawn(
            "kernel-routes",
            KernelReconciler::new(table),
            MAILBOX_CAPACITY,
            shutdown.child_token(),
        );

        if let Err(e) = kernel.adopt().await {
            warn!(error = %e, "Could not read existing kernel routes, starting empty");
        }

        Ok(Self {
            refcount,
            kernel,
            handles: vec![refcount_handle, kernel_handle],
        })
    }
}

fn kernel_table(config: &Config) -> anyhow::Result<Arc<dyn KernelRouteTable>> {
    match open_route_table(&config.kernel) {
        Ok(table) => {
            info!(
                enabled = config.kernel.enabled,
                protocol = config.kernel.protocol,
                metric = config.kernel.metric,
                "Kernel route table ready"
            );
            Ok(table)
        }
        Err(DomainError::UnsupportedPlatform(reason)) => {
            warn!(reason = %reason, "Kernel routes will only be logged");
            Ok(Arc::new(LoggingRouteTable::new()))
        }
        Err(e) => Err(e.into()),
    }
}
