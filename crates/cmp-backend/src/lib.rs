//! # CMP Compute Backend
//!
//! The compute backend is the external platform that actually realizes
//! namespaces and instances. The orchestrator only ever talks to it through
//! the [`ComputeBackend`] trait, whose every call may fail independently.
//!
//! ## Implementations
//!
//! - [`KubeBackend`]: Kubernetes. Containers are pods, VMs are KubeVirt
//!   `VirtualMachine` objects; one driver per instance kind.
//! - [`SimulatedBackend`]: in-process backend with a call log and fault
//!   injection, for development and tests.
//! - [`TimeoutBackend`]: decorator bounding every call with a deadline.
//!
//! Which one runs is decided once, from [`BackendConfig`], by [`connect`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod kubernetes;
pub mod simulated;
pub mod timeout;
pub mod traits;

pub use config::{connect, BackendConfig, KubeConfigMode, ProviderConfig, WorkloadImages};
pub use error::{BackendError, BackendResult};
pub use kubernetes::KubeBackend;
pub use simulated::{BackendCall, BackendOp, SimulatedBackend};
pub use timeout::TimeoutBackend;
pub use traits::{BackendPhase, ComputeBackend, InstanceRef, InstanceRequest};
