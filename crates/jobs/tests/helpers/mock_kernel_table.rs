use async_trait::async_trait;
use bgp_dns_application::ports::KernelRouteTable;
use bgp_dns_domain::{DomainError, RouteKey, RouteSpec};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum KernelCall {
    Add(RouteSpec),
    Replace(RouteSpec),
    Delete(RouteKey),
}

/// Records every kernel call; the table itself starts empty.
#[derive(Clone, Default)]
pub struct MockKernelTable {
    calls: Arc<Mutex<Vec<KernelCall>>>,
}

impl MockKernelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<KernelCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: KernelCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl KernelRouteTable for MockKernelTable {
    async fn add(&self, route: &RouteSpec) -> Result<(), DomainError> {
        self.record(KernelCall::Add(route.clone()));
        Ok(())
    }

    async fn replace(&self, route: &RouteSpec) -> Result<(), DomainError> {
        self.record(KernelCall::Replace(route.clone()));
        Ok(())
    }

    async fn delete(&self, key: &RouteKey) -> Result<(), DomainError> {
        self.record(KernelCall::Delete(*key));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RouteSpec>, DomainError> {
        Ok(Vec::new())
    }
}
