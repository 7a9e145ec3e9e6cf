//! Cluster records and creation requests

use crate::{ClusterId, InstanceKind, ResourceAmount, TenantId};
use serde::{Deserialize, Serialize};

/// Longest accepted cluster name
pub const MAX_CLUSTER_NAME_LEN: usize = 100;

/// Request to provision a cluster of identically shaped instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub kind: InstanceKind,

    /// CPU cores per instance
    pub cpu_per_instance: f64,

    /// Memory (GB) per instance
    pub memory_per_instance: f64,

    pub instance_count: u32,
}

impl ClusterSpec {
    pub fn new(
        name: impl Into<String>,
        kind: InstanceKind,
        cpu_per_instance: f64,
        memory_per_instance: f64,
        instance_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            cpu_per_instance,
            memory_per_instance,
            instance_count,
        }
    }

    /// Validate the request shape
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        if self.name.is_empty() {
            return Err(SpecValidationError::EmptyName);
        }

        if self.name.chars().count() > MAX_CLUSTER_NAME_LEN {
            return Err(SpecValidationError::NameTooLong(MAX_CLUSTER_NAME_LEN));
        }

        if !is_positive(self.cpu_per_instance) {
            return Err(SpecValidationError::InvalidResources(
                "cpu_per_instance must be > 0".into(),
            ));
        }

        if !is_positive(self.memory_per_instance) {
            return Err(SpecValidationError::InvalidResources(
                "memory_per_instance must be > 0".into(),
            ));
        }

        if self.instance_count == 0 {
            return Err(SpecValidationError::InvalidResources(
                "instance_count must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Total reservation for the whole batch
    pub fn total(&self) -> ResourceAmount {
        ResourceAmount::new(self.cpu_per_instance, self.memory_per_instance)
            .times(self.instance_count)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Cluster spec validation errors
#[derive(Debug, thiserror::Error)]
pub enum SpecValidationError {
    #[error("Cluster name cannot be empty")]
    EmptyName,

    #[error("Cluster name longer than {0} characters")]
    NameTooLong(usize),

    #[error("Invalid resources: {0}")]
    InvalidResources(String),
}

/// A named group of instances sharing one isolation namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,

    /// Globally unique name
    pub name: String,

    /// Backend isolation namespace, derived from the name
    pub namespace: String,

    pub kind: InstanceKind,
    pub cpu_per_instance: f64,
    pub memory_per_instance: f64,

    /// Intended number of instances (the reservation is sized on this)
    pub instance_count: u32,

    /// Owning tenant
    pub tenant_id: TenantId,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Cluster {
    /// Build the record for an accepted spec
    pub fn from_spec(spec: &ClusterSpec, tenant_id: TenantId) -> Self {
        Self {
            id: ClusterId::generate(),
            name: spec.name.clone(),
            namespace: Self::namespace_for(&spec.name),
            kind: spec.kind,
            cpu_per_instance: spec.cpu_per_instance,
            memory_per_instance: spec.memory_per_instance,
            instance_count: spec.instance_count,
            tenant_id,
            created_at: chrono::Utc::now(),
        }
    }

    /// Namespace name for a cluster name
    pub fn namespace_for(name: &str) -> String {
        format!("{}-ns", name)
    }

    /// Name of the instance at `index`
    pub fn instance_name(&self, index: u32) -> String {
        format!("{}-instance-{}", self.name, index)
    }

    pub fn per_instance(&self) -> ResourceAmount {
        ResourceAmount::new(self.cpu_per_instance, self.memory_per_instance)
    }

    /// Quota held by the cluster: per-instance shape times intended count
    pub fn reservation(&self) -> ResourceAmount {
        self.per_instance().times(self.instance_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ClusterSpec {
        ClusterSpec::new("analytics", InstanceKind::Vm, 2.0, 4.0, 4)
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut s = spec();
        s.name = String::new();
        assert!(matches!(s.validate(), Err(SpecValidationError::EmptyName)));

        let mut s = spec();
        s.name = "x".repeat(MAX_CLUSTER_NAME_LEN + 1);
        assert!(matches!(s.validate(), Err(SpecValidationError::NameTooLong(_))));

        let mut s = spec();
        s.cpu_per_instance = 0.0;
        assert!(s.validate().is_err());

        let mut s = spec();
        s.memory_per_instance = f64::NAN;
        assert!(s.validate().is_err());

        let mut s = spec();
        s.instance_count = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_cluster_derivations() {
        let cluster = Cluster::from_spec(&spec(), TenantId::generate());
        assert_eq!(cluster.namespace, "analytics-ns");
        assert_eq!(cluster.instance_name(0), "analytics-instance-0");
        assert_eq!(cluster.reservation(), ResourceAmount::new(8.0, 16.0));
        assert_eq!(cluster.reservation(), spec().total());
    }
}
