//! # CMP Core
//!
//! Resource quota enforcement and instance lifecycle orchestration.
//!
//! ## Components
//!
//! - [`QuotaLedger`]: authorizes allocations against a tenant's remaining
//!   CPU/memory and applies signed usage deltas, serialized per tenant
//! - [`InstanceLifecycle`]: the instance state machine; one backend call and
//!   one record update per transition
//! - [`ClusterOrchestrator`]: provisions and tears down clusters as a unit,
//!   runs bulk suspend/resume with per-member accounting
//! - [`ReconciliationProbe`]: refreshes instance status from the backend on
//!   read, serving the last known status when the backend does not answer
//!
//! Persistence goes through the [`store`] traits; [`InMemoryStore`] is the
//! bundled implementation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cmp_backend::SimulatedBackend;
//! use cmp_core::{ClusterOrchestrator, InMemoryStore, NewTenant};
//! use cmp_types::{ClusterSpec, InstanceKind};
//!
//! # async fn example() -> cmp_core::Result<()> {
//! let orchestrator = ClusterOrchestrator::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(SimulatedBackend::new()),
//! );
//!
//! let tenant = orchestrator
//!     .register_tenant(NewTenant {
//!         username: "alice".into(),
//!         token: "secret".into(),
//!         quota_cpu: 10.0,
//!         quota_memory: 20.0,
//!     })
//!     .await?;
//!
//! let created = orchestrator
//!     .create_cluster(&tenant.id, ClusterSpec::new("web", InstanceKind::Container, 2.0, 4.0, 4))
//!     .await?;
//! assert_eq!(created.instances.len(), 4);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod orchestrator;
pub mod probe;
pub mod quota;
pub mod store;

pub use error::{FleetError, Result, StorageError};
pub use identity::{IdentityStore, StoreIdentity};
pub use lifecycle::InstanceLifecycle;
pub use orchestrator::{ClusterOrchestrator, NewTenant};
pub use probe::{reconcile_status, ReconciliationProbe};
pub use quota::{QuotaLedger, TenantGuard};
pub use store::{
    ClusterStore, FleetStore, InMemoryStore, InstanceStore, StorageResult, TenantStore,
};
