use crate::actor::{Handler, Mailbox};
use crate::ports::KernelRouteTable;
use async_trait::async_trait;
use bgp_dns_domain::{DomainError, RouteKey, RouteSpec};
use ipnetwork::Ipv4Network;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

type NextHops = SmallVec<[Ipv4Addr; 4]>;

pub enum KernelCommand {
    Advance {
        prefix: Ipv4Network,
        next_hop: Ipv4Addr,
        metric: u32,
    },
    Withdraw {
        prefix: Ipv4Network,
        next_hop: Ipv4Addr,
        metric: u32,
    },
    /// Seed the model from routes already installed with our protocol tag.
    Adopt,
    Snapshot(oneshot::Sender<Vec<RouteSpec>>),
}

pub type KernelMailbox = Mailbox<KernelCommand>;

/// Keeps the kernel table in step with the injected BGP paths.
///
/// The model is updated even when the kernel call fails so that later
/// next-hop changes are computed against the intended state.
pub struct KernelReconciler {
    table: Arc<dyn KernelRouteTable>,
    routes: BTreeMap<RouteKey, NextHops>,
}

impl KernelReconciler {
    pub fn new(table: Arc<dyn KernelRouteTable>) -> Self {
        Self {
            table,
            routes: BTreeMap::new(),
        }
    }

    pub async fn advance(&mut self, key: RouteKey, next_hop: Ipv4Addr) {
        let hops = self.routes.entry(key).or_default();
        if hops.contains(&next_hop) {
            debug!(route = %key, %next_hop, "Next-hop already installed");
            return;
        }
        hops.push(next_hop);

        let spec = RouteSpec::new(key, hops.to_vec());
        let result = if spec.next_hops.len() == 1 {
            self.table.add(&spec).await
        } else {
            self.table.replace(&spec).await
        };

        match result {
            Ok(()) => info!(route = %spec, "Kernel route installed"),
            Err(DomainError::KernelRouteExists(_)) => {
                warn!(route = %spec, "Kernel route already present, adopting it")
            }
            Err(e) => error!(route = %spec, error = %e, "Failed to install kernel route"),
        }
    }

    pub async fn withdraw(&mut self, key: RouteKey, next_hop: Ipv4Addr) {
        let Some(hops) = self.routes.get_mut(&key) else {
            warn!(route = %key, %next_hop, "Withdraw for unknown kernel route");
            return;
        };
        let Some(pos) = hops.iter().position(|h| *h == next_hop) else {
            warn!(route = %key, %next_hop, "Withdraw for unknown next-hop");
            return;
        };
        hops.remove(pos);

        if hops.is_empty() {
            self.routes.remove(&key);
            match self.table.delete(&key).await {
                Ok(()) => info!(route = %key, "Kernel route removed"),
                Err(e) => error!(route = %key, error = %e, "Failed to remove kernel route"),
            }
            return;
        }

        let spec = RouteSpec::new(key, hops.to_vec());
        match self.table.replace(&spec).await {
            Ok(()) => info!(route = %spec, "Kernel route next-hop removed"),
            Err(e) => error!(route = %spec, error = %e, "Failed to update kernel route"),
        }
    }

    pub async fn adopt(&mut self) -> Result<(), DomainError> {
        let existing = self.table.list().await?;
        for route in existing {
            let hops = self.routes.entry(route.key).or_default();
            for hop in route.next_hops {
                if !hops.contains(&hop) {
                    hops.push(hop);
                }
            }
        }
        info!(routes = self.routes.len(), "Adopted existing kernel routes");
        Ok(())
    }

    pub fn routes(&self) -> Vec<RouteSpec> {
        self.routes
            .iter()
            .map(|(key, hops)| RouteSpec::new(*key, hops.to_vec()))
            .collect()
    }
}

#[async_trait]
impl Handler for KernelReconciler {
    type Message = KernelCommand;

    async fn handle(&mut self, message: KernelCommand) -> Result<(), DomainError> {
        match message {
            KernelCommand::Advance {
                prefix,
                next_hop,
                metric,
            } => self.advance(RouteKey::new(prefix, metric), next_hop).await,
            KernelCommand::Withdraw {
                prefix,
                next_hop,
                metric,
            } => self.withdraw(RouteKey::new(prefix, metric), next_hop).await,
            KernelCommand::Adopt => return self.adopt().await,
            KernelCommand::Snapshot(reply) => {
                let _ = reply.send(self.routes());
            }
        }
        Ok(())
    }

    async fn on_stop(&mut self) {
        let installed: Vec<(RouteKey, NextHops)> =
            self.routes.iter().map(|(k, h)| (*k, h.clone())).collect();
        info!(routes = installed.len(), "Removing injected kernel routes");

        for (key, hops) in installed {
            for hop in hops {
                self.withdraw(key, hop).await;
            }
        }
    }
}

impl Mailbox<KernelCommand> {
    pub async fn advance(
        &self,
        prefix: Ipv4Network,
        next_hop: Ipv4Addr,
        metric: u32,
    ) -> Result<(), DomainError> {
        self.tell(KernelCommand::Advance {
            prefix,
            next_hop,
            metric,
        })
        .await
    }

    pub async fn withdraw(
        &self,
        prefix: Ipv4Network,
        next_hop: Ipv4Addr,
        metric: u32,
    ) -> Result<(), DomainError> {
        self.tell(KernelCommand::Withdraw {
            prefix,
            next_hop,
            metric,
        })
        .await
    }

    pub async fn adopt(&self) -> Result<(), DomainError> {
        self.ask(KernelCommand::Adopt).await
    }

    pub async fn routes(&self) -> Result<Vec<RouteSpec>, DomainError> {
        let (reply, routes) = oneshot::channel();
        self.tell(KernelCommand::Snapshot(reply)).await?;
        routes.await.map_err(|_| self.stopped())
    }
}
