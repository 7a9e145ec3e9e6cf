//! Instance state machine
//!
//! Each transition is one backend call followed by one record update:
//!
//! | Operation | From        | Backend call | Success     | Backend failure        |
//! |-----------|-------------|--------------|-------------|------------------------|
//! | create    | `pending`   | create       | `running`   | `failed`               |
//! | start     | `stopped`   | start        | `running`   | unchanged, error       |
//! | stop      | `running`   | stop         | `stopped`   | unchanged, error       |
//! | suspend   | `running`   | stop         | `suspended` | unchanged, error       |
//! | resume    | `suspended` | start        | `running`   | unchanged, error       |
//! | delete    | any         | delete       | removed     | removed, failure logged|
//!
//! Containers cannot be powered back on; `start` and `resume` on a container
//! are rejected before the backend is called.

use crate::error::{FleetError, Result};
use crate::store::InstanceStore;
use cmp_backend::{ComputeBackend, InstanceRef, InstanceRequest};
use cmp_types::{Cluster, Instance, InstanceOperation, InstanceStatus, InstanceTransition};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct InstanceLifecycle {
    backend: Arc<dyn ComputeBackend>,
    instances: Arc<dyn InstanceStore>,
}

impl InstanceLifecycle {
    pub fn new(backend: Arc<dyn ComputeBackend>, instances: Arc<dyn InstanceStore>) -> Self {
        Self { backend, instances }
    }

    /// Record a pending instance and realize it on the backend.
    ///
    /// A backend failure is contained: the instance ends up `failed` and is
    /// still returned. Only storage failures are errors.
    pub async fn create(&self, mut instance: Instance, cluster: &Cluster) -> Result<Instance> {
        if instance.status != InstanceStatus::Pending {
            return Err(FleetError::InvalidRequest(format!(
                "instance {} is {}, only pending instances can be created",
                instance.name, instance.status
            )));
        }
        self.instances.upsert_instance(&instance).await?;

        match self
            .backend
            .create_instance(&InstanceRequest::of(&instance, cluster))
            .await
        {
            Ok(()) => {
                instance.set_status(InstanceStatus::Running);
                info!(instance = %instance.name, cluster = %cluster.name, "Instance created");
            }
            Err(e) => {
                instance.set_status(InstanceStatus::Failed);
                error!(
                    instance = %instance.name,
                    cluster = %cluster.name,
                    error = %e,
                    "Instance creation failed"
                );
            }
        }

        self.instances.upsert_instance(&instance).await?;
        Ok(instance)
    }

    /// Run a start/stop/suspend/resume transition
    pub async fn operate(
        &self,
        mut instance: Instance,
        cluster: &Cluster,
        operation: InstanceOperation,
    ) -> Result<InstanceTransition> {
        if operation.powers_on() && !cluster.kind.supports_restart() {
            return Err(FleetError::UnsupportedOperation {
                operation,
                kind: cluster.kind,
            });
        }

        let previous_status = instance.status;
        let required = operation.required_status();
        if previous_status != required {
            return Err(FleetError::InvalidState {
                operation,
                required,
                actual: previous_status,
            });
        }

        let target = InstanceRef::of(&instance, cluster);
        let call = if operation.powers_on() {
            self.backend.start_instance(&target).await
        } else {
            self.backend.stop_instance(&target).await
        };

        if let Err(e) = call {
            warn!(
                instance = %instance.name,
                operation = %operation,
                error = %e,
                "Backend rejected instance transition"
            );
            return Err(e.into());
        }

        let new_status = operation.target_status();
        instance.set_status(new_status);
        self.instances.upsert_instance(&instance).await?;

        info!(
            instance = %instance.name,
            operation = %operation,
            from = %previous_status,
            to = %new_status,
            "Instance transitioned"
        );

        Ok(InstanceTransition {
            instance,
            previous_status,
            new_status,
        })
    }

    /// Remove an instance from the backend (best effort) and from the store.
    ///
    /// Returns whether the backend resource is known to be gone.
    pub async fn delete(&self, instance: &Instance, cluster: &Cluster) -> Result<bool> {
        let backend_ok = match self
            .backend
            .delete_instance(&InstanceRef::of(instance, cluster))
            .await
        {
            Ok(()) => true,
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                warn!(
                    instance = %instance.name,
                    error = %e,
                    "Backend delete failed, removing record anyway"
                );
                false
            }
        };

        self.instances.delete_instance(&instance.id).await?;
        Ok(backend_ok)
    }
}
