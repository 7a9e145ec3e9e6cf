//! Compute backend capability set

use crate::error::BackendResult;
use async_trait::async_trait;
use cmp_types::{Cluster, Instance, InstanceKind, ResourceAmount};
use serde::{Deserialize, Serialize};

/// Address of an instance on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRef {
    pub name: String,
    pub namespace: String,
    pub kind: InstanceKind,
}

impl InstanceRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, kind: InstanceKind) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind,
        }
    }

    /// Address of a recorded instance of `cluster`
    pub fn of(instance: &Instance, cluster: &Cluster) -> Self {
        Self::new(instance.resource_name(), &cluster.namespace, cluster.kind)
    }
}

/// Request to realize one instance on the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRequest {
    pub name: String,
    pub namespace: String,
    pub kind: InstanceKind,

    /// CPU cores and memory (GB) for this one instance
    pub resources: ResourceAmount,
}

impl InstanceRequest {
    pub fn of(instance: &Instance, cluster: &Cluster) -> Self {
        Self {
            name: instance.resource_name().to_string(),
            namespace: cluster.namespace.clone(),
            kind: cluster.kind,
            resources: cluster.per_instance(),
        }
    }

    pub fn target(&self) -> InstanceRef {
        InstanceRef::new(&self.name, &self.namespace, self.kind)
    }
}

/// Backend-native lifecycle phase as observed by a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendPhase {
    Running,
    Pending,
    Failed,
    Unknown,
    Stopped,
    /// Any other native phase (e.g. a pod that `Succeeded`)
    Other(String),
}

impl BackendPhase {
    /// Parse a Kubernetes pod phase
    pub fn from_pod_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Running") => BackendPhase::Running,
            Some("Pending") => BackendPhase::Pending,
            Some("Failed") => BackendPhase::Failed,
            Some("Unknown") | None => BackendPhase::Unknown,
            Some(other) => BackendPhase::Other(other.to_string()),
        }
    }
}

/// Operations the orchestrator needs from a compute platform.
///
/// Calls are independent and non-atomic: any of them may fail, and a failure
/// says nothing about the state of other resources.
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Short provider name for logs and status output
    fn name(&self) -> &str;

    /// Create an isolation namespace. An existing namespace is reported as
    /// [`BackendError::AlreadyExists`](crate::BackendError::AlreadyExists).
    async fn create_namespace(&self, namespace: &str) -> BackendResult<()>;

    /// Delete a namespace and everything in it. A missing namespace is
    /// reported as [`BackendError::NotFound`](crate::BackendError::NotFound).
    async fn delete_namespace(&self, namespace: &str) -> BackendResult<()>;

    async fn create_instance(&self, request: &InstanceRequest) -> BackendResult<()>;

    async fn delete_instance(&self, target: &InstanceRef) -> BackendResult<()>;

    /// Power an instance on. Fails with `Unsupported` for containers.
    async fn start_instance(&self, target: &InstanceRef) -> BackendResult<()>;

    /// Power an instance off. For containers this destroys the container.
    async fn stop_instance(&self, target: &InstanceRef) -> BackendResult<()>;

    async fn instance_status(&self, target: &InstanceRef) -> BackendResult<BackendPhase>;
}
