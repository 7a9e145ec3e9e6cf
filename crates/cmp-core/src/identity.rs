//! Credential resolution

use crate::error::{FleetError, Result};
use crate::store::TenantStore;
use async_trait::async_trait;
use cmp_types::Tenant;
use std::sync::Arc;

/// Resolves a bearer credential to the tenant it belongs to
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with [`FleetError::Authentication`] for unknown credentials
    async fn resolve(&self, token: &str) -> Result<Tenant>;
}

/// Identity store backed by the tenant records themselves
#[derive(Clone)]
pub struct StoreIdentity {
    tenants: Arc<dyn TenantStore>,
}

impl StoreIdentity {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }
}

#[async_trait]
impl IdentityStore for StoreIdentity {
    async fn resolve(&self, token: &str) -> Result<Tenant> {
        if token.is_empty() {
            return Err(FleetError::Authentication("missing credential".into()));
        }

        self.tenants
            .get_tenant_by_token(token)
            .await?
            .ok_or_else(|| FleetError::Authentication("invalid credential".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_resolve() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_tenant(Tenant::new("alice", "secret", 4.0, 8.0)).await.unwrap();
        let identity = StoreIdentity::new(store);

        assert_eq!(identity.resolve("secret").await.unwrap().username, "alice");
        assert!(matches!(
            identity.resolve("wrong").await,
            Err(FleetError::Authentication(_))
        ));
        assert!(matches!(
            identity.resolve("").await,
            Err(FleetError::Authentication(_))
        ));
    }
}
