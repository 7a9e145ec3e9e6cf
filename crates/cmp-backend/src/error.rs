//! Compute backend error types

use cmp_types::InstanceKind;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a compute backend
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The object to create already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The object to act on does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend API rejected the request
    #[error("Backend API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The call did not complete within the configured deadline
    #[error("Timed out after {after:?} during {operation}")]
    Timeout { operation: String, after: Duration },

    /// The operation is not defined for this kind of instance
    #[error("Operation {operation} is not supported for {kind} instances")]
    Unsupported {
        operation: String,
        kind: InstanceKind,
    },

    /// The backend could not be reached or configured
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// A resource manifest could not be built
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// Transport or client-side failure
    #[error("Client error: {0}")]
    Client(String),

    /// Failure injected by the simulated backend
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl BackendError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

/// Result type for backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;
