//! Tenant records and quota views

use crate::{ResourceAmount, TenantId};
use serde::{Deserialize, Serialize};

/// A quota-bounded owner of clusters.
///
/// `used_*` are running totals maintained by the quota ledger; they are only
/// ever changed by applying a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,

    /// Unique login name
    pub username: String,

    /// Bearer credential resolved by the identity store
    pub token: String,

    /// Hard ceiling on allocated CPU cores
    pub quota_cpu: f64,

    /// Hard ceiling on allocated memory (GB)
    pub quota_memory: f64,

    pub used_cpu: f64,
    pub used_memory: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Tenant {
    /// Create a tenant with zero usage
    pub fn new(
        username: impl Into<String>,
        token: impl Into<String>,
        quota_cpu: f64,
        quota_memory: f64,
    ) -> Self {
        Self {
            id: TenantId::generate(),
            username: username.into(),
            token: token.into(),
            quota_cpu,
            quota_memory,
            used_cpu: 0.0,
            used_memory: 0.0,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn quota(&self) -> ResourceAmount {
        ResourceAmount::new(self.quota_cpu, self.quota_memory)
    }

    pub fn used(&self) -> ResourceAmount {
        ResourceAmount::new(self.used_cpu, self.used_memory)
    }

    pub fn available(&self) -> ResourceAmount {
        self.quota() - self.used()
    }

    pub fn summary(&self) -> QuotaSummary {
        let available = self.available();
        QuotaSummary {
            total_cpu: self.quota_cpu,
            total_memory: self.quota_memory,
            used_cpu: self.used_cpu,
            used_memory: self.used_memory,
            available_cpu: available.cpu,
            available_memory: available.memory,
        }
    }
}

/// Point-in-time quota view for a tenant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaSummary {
    pub total_cpu: f64,
    pub total_memory: f64,
    pub used_cpu: f64,
    pub used_memory: f64,
    pub available_cpu: f64,
    pub available_memory: f64,
}
