//! Deadline decorator for compute backends

use crate::error::{BackendError, BackendResult};
use crate::traits::{BackendPhase, ComputeBackend, InstanceRef, InstanceRequest};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Wraps a backend so that every call completes within `timeout`.
///
/// An expired deadline surfaces as [`BackendError::Timeout`] and is handled
/// by callers exactly like an explicit backend failure.
pub struct TimeoutBackend {
    inner: Arc<dyn ComputeBackend>,
    timeout: Duration,
}

impl TimeoutBackend {
    pub fn new(inner: Arc<dyn ComputeBackend>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        target: &str,
        call: impl Future<Output = BackendResult<T>> + Send,
    ) -> BackendResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    backend = self.inner.name(),
                    operation,
                    target,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Backend call timed out"
                );
                Err(BackendError::Timeout {
                    operation: format!("{} {}", operation, target),
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl ComputeBackend for TimeoutBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_namespace(&self, namespace: &str) -> BackendResult<()> {
        self.bounded("create_namespace", namespace, self.inner.create_namespace(namespace))
            .await
    }

    async fn delete_namespace(&self, namespace: &str) -> BackendResult<()> {
        self.bounded("delete_namespace", namespace, self.inner.delete_namespace(namespace))
            .await
    }

    async fn create_instance(&self, request: &InstanceRequest) -> BackendResult<()> {
        self.bounded("create_instance", &request.name, self.inner.create_instance(request))
            .await
    }

    async fn delete_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.bounded("delete_instance", &target.name, self.inner.delete_instance(target))
            .await
    }

    async fn start_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.bounded("start_instance", &target.name, self.inner.start_instance(target))
            .await
    }

    async fn stop_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.bounded("stop_instance", &target.name, self.inner.stop_instance(target))
            .await
    }

    async fn instance_status(&self, target: &InstanceRef) -> BackendResult<BackendPhase> {
        self.bounded("instance_status", &target.name, self.inner.instance_status(target))
            .await
    }
}
