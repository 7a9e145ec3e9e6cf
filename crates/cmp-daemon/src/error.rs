//! Error types for cmp-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cmp_core::{FleetError, StorageError};
use cmp_types::{InstanceStatus, ResourceAmount};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Compute backend could not be set up
    #[error("Backend error: {0}")]
    Backend(#[from] cmp_backend::BackendError),

    /// Startup operation on the orchestrator failed
    #[error("Orchestrator error: {0}")]
    Fleet(#[from] FleetError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unknown credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Quota denial
    #[error("Quota exceeded: requested {requested}, available {available}")]
    QuotaExceeded {
        requested: ResourceAmount,
        available: ResourceAmount,
    },

    /// Instance not in the required state
    #[error("Invalid state: {message}")]
    InvalidState {
        message: String,
        required: InstanceStatus,
        actual: InstanceStatus,
    },

    /// Operation not defined for the instance kind
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Compute backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        let message = err.to_string();
        match err {
            FleetError::Authentication(msg) => ApiError::Unauthorized(msg),
            FleetError::NotFound(msg) => ApiError::NotFound(msg),
            FleetError::QuotaExceeded {
                requested,
                available,
            } => ApiError::QuotaExceeded {
                requested,
                available,
            },
            FleetError::InvalidState {
                required, actual, ..
            } => ApiError::InvalidState {
                message,
                required,
                actual,
            },
            FleetError::UnsupportedOperation { .. } => ApiError::UnsupportedOperation(message),
            FleetError::AlreadyExists(msg) => ApiError::Conflict(msg),
            FleetError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            FleetError::Backend(e) => ApiError::Backend(e.to_string()),
            FleetError::Storage(e) => ApiError::Storage(e),
            FleetError::Interrupted(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::QuotaExceeded { .. } => (StatusCode::FORBIDDEN, "QUOTA_EXCEEDED"),
            ApiError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
            ApiError::UnsupportedOperation(_) => (StatusCode::CONFLICT, "UNSUPPORTED_OPERATION"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
            ApiError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let details = match &self {
            ApiError::QuotaExceeded {
                requested,
                available,
            } => Some(json!({ "requested": requested, "available": available })),
            ApiError::InvalidState {
                required, actual, ..
            } => Some(json!({ "required": required, "actual": actual })),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cmp_types::{InstanceKind, InstanceOperation};

    fn status_of(err: FleetError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_fleet_error_status_codes() {
        assert_eq!(
            status_of(FleetError::Authentication("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(FleetError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(FleetError::QuotaExceeded {
                requested: ResourceAmount::new(1.0, 1.0),
                available: ResourceAmount::ZERO,
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(FleetError::InvalidState {
                operation: InstanceOperation::Stop,
                required: InstanceStatus::Running,
                actual: InstanceStatus::Stopped,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FleetError::UnsupportedOperation {
                operation: InstanceOperation::Start,
                kind: InstanceKind::Container,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FleetError::AlreadyExists("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FleetError::InvalidRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FleetError::Backend(cmp_backend::BackendError::Client("x".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(FleetError::Storage(StorageError::Query("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(FleetError::Interrupted("task cancelled".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
