//! Results of cluster-level and instance-level operations

use crate::{Cluster, Instance, InstanceStatus, ResourceAmount};
use serde::{Deserialize, Serialize};

/// Per-unit accounting of a bulk suspend or resume
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Members not in the operation's source state
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    pub fn record_skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }
}

/// Result of provisioning a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCreation {
    pub cluster: Cluster,
    pub instances: Vec<Instance>,
    /// Instances that reached `running`
    pub running: usize,
    /// Quota applied to the owning tenant
    pub reserved: ResourceAmount,
}

/// A cluster with its member instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDetail {
    pub cluster: Cluster,
    pub instances: Vec<Instance>,
}

/// Result of tearing a cluster down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDeletion {
    pub instances_deleted: usize,
    /// Members whose backend delete failed; their records are gone regardless
    pub backend_failures: usize,
    pub namespace: String,
    /// Quota returned to the owning tenant
    pub released: ResourceAmount,
}

/// Result of a single-instance operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceTransition {
    pub instance: Instance,
    pub previous_status: InstanceStatus,
    pub new_status: InstanceStatus,
}
