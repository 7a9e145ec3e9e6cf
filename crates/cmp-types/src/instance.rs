//! Instance records and the lifecycle vocabulary
//!
//! An Instance is a single VM or container belonging to exactly one cluster.
//! Its `status` is the only frequently mutated field.

use crate::{Cluster, ClusterId, InstanceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of compute resource backing an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    /// Virtual machine; can be powered off and on again
    Vm,
    /// Container; stopping destroys it, so it can only be recreated
    Container,
}

impl InstanceKind {
    /// Whether a stopped/suspended instance of this kind can be started again
    pub fn supports_restart(&self) -> bool {
        matches!(self, InstanceKind::Vm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceKind::Vm => "vm",
            InstanceKind::Container => "container",
        }
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Recorded locally, not yet realized on the backend
    Pending,
    Running,
    Stopped,
    Suspended,
    /// Terminal for this instance unless recreated
    Failed,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Suspended => "suspended",
            InstanceStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that move an existing instance between non-terminal states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceOperation {
    Start,
    Stop,
    Suspend,
    Resume,
}

impl InstanceOperation {
    /// State the instance must be in for the operation to be attempted
    pub fn required_status(&self) -> InstanceStatus {
        match self {
            InstanceOperation::Start => InstanceStatus::Stopped,
            InstanceOperation::Stop | InstanceOperation::Suspend => InstanceStatus::Running,
            InstanceOperation::Resume => InstanceStatus::Suspended,
        }
    }

    /// State the instance is in after the backend call succeeds
    pub fn target_status(&self) -> InstanceStatus {
        match self {
            InstanceOperation::Start | InstanceOperation::Resume => InstanceStatus::Running,
            InstanceOperation::Stop => InstanceStatus::Stopped,
            InstanceOperation::Suspend => InstanceStatus::Suspended,
        }
    }

    /// Whether the operation powers an instance back on
    pub fn powers_on(&self) -> bool {
        matches!(self, InstanceOperation::Start | InstanceOperation::Resume)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceOperation::Start => "start",
            InstanceOperation::Stop => "stop",
            InstanceOperation::Suspend => "suspend",
            InstanceOperation::Resume => "resume",
        }
    }
}

impl fmt::Display for InstanceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned compute unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,

    /// Owning cluster
    pub cluster_id: ClusterId,

    /// Globally unique name, `<cluster-name>-instance-<index>`
    pub name: String,

    /// Position within the cluster
    pub index: u32,

    pub status: InstanceStatus,

    /// Name of the backend resource (pod / virtual machine)
    pub backend_handle: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Instance {
    /// A freshly recorded instance, not yet realized on the backend
    pub fn pending(cluster: &Cluster, index: u32) -> Self {
        let name = cluster.instance_name(index);
        let now = chrono::Utc::now();
        Self {
            id: InstanceId::generate(),
            cluster_id: cluster.id,
            backend_handle: Some(name.clone()),
            name,
            index,
            status: InstanceStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the status, bumping `updated_at`
    pub fn set_status(&mut self, status: InstanceStatus) {
        self.status = status;
        self.updated_at = chrono::Utc::now();
    }

    /// Name of the resource on the backend
    pub fn resource_name(&self) -> &str {
        self.backend_handle.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusterSpec, TenantId};

    #[test]
    fn test_operation_table() {
        use InstanceOperation::*;
        use InstanceStatus::*;

        assert_eq!((Start.required_status(), Start.target_status()), (Stopped, Running));
        assert_eq!((Stop.required_status(), Stop.target_status()), (Running, Stopped));
        assert_eq!((Suspend.required_status(), Suspend.target_status()), (Running, Suspended));
        assert_eq!((Resume.required_status(), Resume.target_status()), (Suspended, Running));
    }

    #[test]
    fn test_only_vms_restart() {
        assert!(InstanceKind::Vm.supports_restart());
        assert!(!InstanceKind::Container.supports_restart());
    }

    #[test]
    fn test_pending_instance_naming() {
        let spec = ClusterSpec::new("web", InstanceKind::Container, 1.0, 2.0, 3);
        let cluster = Cluster::from_spec(&spec, TenantId::generate());
        let instance = Instance::pending(&cluster, 2);

        assert_eq!(instance.name, "web-instance-2");
        assert_eq!(instance.resource_name(), "web-instance-2");
        assert_eq!(instance.status, InstanceStatus::Pending);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&InstanceStatus::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");
        let op: InstanceOperation = serde_json::from_str("\"resume\"").unwrap();
        assert_eq!(op, InstanceOperation::Resume);
    }
}
