use async_trait::async_trait;
use shared::Tenant;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Multi-tenant directory seam. Resolution and onboarding live elsewhere;
/// the engine only lists what exists.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<Vec<Tenant>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, tenant: Tenant) {
        self.tenants.write().await.push(tenant);
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        Ok(self.tenants.read().await.clone())
    }
}
