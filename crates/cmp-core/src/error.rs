//! Error types for quota and lifecycle operations

use cmp_backend::BackendError;
use cmp_types::{
    ClusterId, InstanceId, InstanceKind, InstanceOperation, InstanceStatus, ResourceAmount,
    SpecValidationError,
};
use thiserror::Error;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique key already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

/// Failures of orchestrator operations
#[derive(Debug, Error)]
pub enum FleetError {
    /// The credential does not resolve to a tenant
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Unknown, or owned by another tenant
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authorization denied by the quota ledger
    #[error("Quota exceeded: requested {requested}, available {available}")]
    QuotaExceeded {
        requested: ResourceAmount,
        available: ResourceAmount,
    },

    /// Instance not in the state the operation starts from
    #[error("Cannot {operation} instance: requires {required}, instance is {actual}")]
    InvalidState {
        operation: InstanceOperation,
        required: InstanceStatus,
        actual: InstanceStatus,
    },

    /// Operation not defined for the instance kind
    #[error("Cannot {operation} a {kind} instance")]
    UnsupportedOperation {
        operation: InstanceOperation,
        kind: InstanceKind,
    },

    /// Compute backend failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Name already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The task carrying the operation was aborted before it finished
    #[error("Operation interrupted: {0}")]
    Interrupted(String),
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, FleetError>;

impl FleetError {
    pub fn cluster_not_found(id: &ClusterId) -> Self {
        Self::NotFound(format!("Cluster {}", id))
    }

    pub fn instance_not_found(id: &InstanceId) -> Self {
        Self::NotFound(format!("Instance {}", id))
    }
}

impl From<SpecValidationError> for FleetError {
    fn from(err: SpecValidationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
