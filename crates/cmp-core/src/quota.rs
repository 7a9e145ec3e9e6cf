//! Per-tenant CPU/memory quota ledger
//!
//! Usage counters on the tenant record are the only state shared between
//! concurrent requests of one tenant. A caller that allocates holds the
//! tenant's guard from [`QuotaLedger::lock`] across the whole
//! authorize-then-apply sequence, so two allocations can never both pass
//! against a budget that only one of them fits.

use crate::error::{FleetError, Result};
use crate::store::TenantStore;
use cmp_types::{ResourceAmount, Tenant, TenantId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Authorizes allocations and applies usage deltas.
///
/// Clones share the same per-tenant locks.
#[derive(Clone)]
pub struct QuotaLedger {
    tenants: Arc<dyn TenantStore>,
    locks: Arc<DashMap<TenantId, Arc<Mutex<()>>>>,
}

/// Exclusive hold on one tenant's quota, released on drop
pub struct TenantGuard {
    _guard: OwnedMutexGuard<()>,
}

impl QuotaLedger {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self {
            tenants,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Serialize quota work for one tenant; other tenants are unaffected
    pub async fn lock(&self, tenant_id: &TenantId) -> TenantGuard {
        let mutex = self
            .locks
            .entry(*tenant_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        TenantGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// True iff `request` fits in what the tenant has left
    pub fn authorize(&self, tenant: &Tenant, request: ResourceAmount) -> bool {
        (tenant.used() + request).fits_within(&tenant.quota())
    }

    /// Like [`authorize`](Self::authorize), but a denial is a
    /// `QuotaExceeded` error carrying the requested and available amounts
    pub fn require(&self, tenant: &Tenant, request: ResourceAmount) -> Result<()> {
        if self.authorize(tenant, request) {
            Ok(())
        } else {
            Err(FleetError::QuotaExceeded {
                requested: request,
                available: tenant.available(),
            })
        }
    }

    /// Add a signed delta to the tenant's usage and persist it.
    ///
    /// Does not clamp: increases must have been authorized first.
    pub async fn apply(&self, tenant_id: &TenantId, delta: ResourceAmount) -> Result<Tenant> {
        let mut tenant = self.current(tenant_id).await?;
        tenant.used_cpu += delta.cpu;
        tenant.used_memory += delta.memory;
        self.tenants.update_tenant(&tenant).await?;

        debug!(
            tenant_id = %tenant_id,
            delta_cpu = delta.cpu,
            delta_memory = delta.memory,
            used_cpu = tenant.used_cpu,
            used_memory = tenant.used_memory,
            "Applied quota delta"
        );
        Ok(tenant)
    }

    /// Freshly loaded tenant record
    pub async fn current(&self, tenant_id: &TenantId) -> Result<Tenant> {
        self.tenants
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("Tenant {}", tenant_id)))
    }
}
