//! CMP Types - Core records for multi-tenant compute provisioning
//!
//! CMP (Cloud Management Platform) provisions clusters of compute instances
//! (virtual machines or containers) for tenants under a CPU/memory quota.
//!
//! ## Ownership
//!
//! The records form a strict tree:
//!
//! - **Tenant**: quota-bounded owner of clusters
//! - **Cluster**: a named group of identically shaped instances sharing one
//!   isolation namespace on the compute backend
//! - **Instance**: a single provisioned VM or container
//!
//! Deleting a parent destroys all of its children.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod cluster;
pub mod ids;
pub mod instance;
pub mod outcome;
pub mod resources;
pub mod tenant;

pub use cluster::{Cluster, ClusterSpec, SpecValidationError, MAX_CLUSTER_NAME_LEN};
pub use ids::{ClusterId, IdParseError, InstanceId, TenantId};
pub use instance::{Instance, InstanceKind, InstanceOperation, InstanceStatus};
pub use outcome::{
    BatchOutcome, ClusterCreation, ClusterDeletion, ClusterDetail, InstanceTransition,
};
pub use resources::ResourceAmount;
pub use tenant::{QuotaSummary, Tenant};
