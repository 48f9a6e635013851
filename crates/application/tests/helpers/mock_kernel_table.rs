use async_trait::async_trait;
use bgp_dns_application::ports::KernelRouteTable;
use bgp_dns_domain::{DomainError, RouteKey, RouteSpec};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum KernelCall {
    Add(RouteSpec),
    Replace(RouteSpec),
    Delete(RouteKey),
}

// ============================================================================
// Mock KernelRouteTable
// ============================================================================

#[derive(Clone, Default)]
pub struct MockKernelTable {
    calls: Arc<Mutex<Vec<KernelCall>>>,
    installed: Arc<Mutex<Vec<RouteSpec>>>,
    add_reports_exists: Arc<AtomicBool>,
}

impl MockKernelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(self, route: RouteSpec) -> Self {
        self.installed.lock().unwrap().push(route);
        self
    }

    pub fn calls(&self) -> Vec<KernelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_add_reports_exists(&self, exists: bool) {
        self.add_reports_exists.store(exists, Ordering::Relaxed);
    }
}

#[async_trait]
impl KernelRouteTable for MockKernelTable {
    async fn add(&self, route: &RouteSpec) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push(KernelCall::Add(route.clone()));
        if self.add_reports_exists.load(Ordering::Relaxed) {
            return Err(DomainError::KernelRouteExists(route.to_string()));
        }
        Ok(())
    }

    async fn replace(&self, route: &RouteSpec) -> Result<(), DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push(KernelCall::Replace(route.clone()));
        Ok(())
    }

    async fn delete(&self, key: &RouteKey) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push(KernelCall::Delete(*key));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RouteSpec>, DomainError> {
        Ok(self.installed.lock().unwrap().clone())
    }
}
