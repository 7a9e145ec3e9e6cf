//! Reconciliation of local instance records with backend status
//!
//! Status is refreshed lazily on read. The backend is authoritative when it
//! answers; when it does not, the last known status is served unchanged.

use crate::store::InstanceStore;
use cmp_backend::{BackendPhase, ComputeBackend, InstanceRef};
use cmp_types::{Cluster, Instance, InstanceStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Canonical status for an observed backend phase.
///
/// The backend cannot tell a suspended instance from a stopped one: suspend
/// powers a VM off exactly as stop does. A powered-off observation therefore
/// keeps a local `suspended`, since `resume` is only accepted from that status
/// and overwriting it with `stopped` would strand the instance.
pub fn reconcile_status(local: InstanceStatus, observed: &BackendPhase) -> InstanceStatus {
    match observed {
        BackendPhase::Running => InstanceStatus::Running,
        BackendPhase::Pending => InstanceStatus::Pending,
        BackendPhase::Failed | BackendPhase::Unknown => InstanceStatus::Failed,
        BackendPhase::Stopped | BackendPhase::Other(_) => match local {
            InstanceStatus::Suspended => InstanceStatus::Suspended,
            _ => InstanceStatus::Stopped,
        },
    }
}

#[derive(Clone)]
pub struct ReconciliationProbe {
    backend: Arc<dyn ComputeBackend>,
    instances: Arc<dyn InstanceStore>,
}

impl ReconciliationProbe {
    pub fn new(backend: Arc<dyn ComputeBackend>, instances: Arc<dyn InstanceStore>) -> Self {
        Self { backend, instances }
    }

    /// Refresh one instance from the backend. Never fails.
    pub async fn refresh(&self, mut instance: Instance, cluster: &Cluster) -> Instance {
        let observed = match self
            .backend
            .instance_status(&InstanceRef::of(&instance, cluster))
            .await
        {
            Ok(phase) => phase,
            Err(e) => {
                debug!(
                    instance = %instance.name,
                    error = %e,
                    "Status query failed, serving last known status"
                );
                return instance;
            }
        };

        let status = reconcile_status(instance.status, &observed);
        if status == instance.status {
            return instance;
        }

        debug!(
            instance = %instance.name,
            from = %instance.status,
            to = %status,
            "Reconciled instance status"
        );
        instance.set_status(status);

        if let Err(e) = self.instances.upsert_instance(&instance).await {
            warn!(instance = %instance.name, error = %e, "Failed to persist reconciled status");
        }
        instance
    }

    /// Refresh every member of a cluster, in order
    pub async fn refresh_all(&self, instances: Vec<Instance>, cluster: &Cluster) -> Vec<Instance> {
        let mut refreshed = Vec::with_capacity(instances.len());
        for instance in instances {
            refreshed.push(self.refresh(instance, cluster).await);
        }
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use cmp_backend::{BackendOp, InstanceRequest, SimulatedBackend};
    use cmp_types::{ClusterSpec, InstanceKind, TenantId};

    #[test]
    fn test_phase_mapping() {
        use InstanceStatus::*;

        assert_eq!(reconcile_status(Stopped, &BackendPhase::Running), Running);
        assert_eq!(reconcile_status(Running, &BackendPhase::Pending), Pending);
        assert_eq!(reconcile_status(Running, &BackendPhase::Failed), Failed);
        assert_eq!(reconcile_status(Running, &BackendPhase::Unknown), Failed);
        assert_eq!(reconcile_status(Running, &BackendPhase::Stopped), Stopped);
        assert_eq!(
            reconcile_status(Running, &BackendPhase::Other("Succeeded".into())),
            Stopped
        );
        assert_eq!(reconcile_status(Suspended, &BackendPhase::Stopped), Suspended);
        assert_eq!(reconcile_status(Suspended, &BackendPhase::Running), Running);
    }

    async fn running_instance(
        backend: &SimulatedBackend,
        store: &InMemoryStore,
    ) -> (Instance, Cluster) {
        let cluster = Cluster::from_spec(
            &ClusterSpec::new("db", InstanceKind::Vm, 1.0, 1.0, 1),
            TenantId::generate(),
        );
        let mut instance = Instance::pending(&cluster, 0);
        backend.create_namespace(&cluster.namespace).await.unwrap();
        backend
            .create_instance(&InstanceRequest::of(&instance, &cluster))
            .await
            .unwrap();
        instance.set_status(InstanceStatus::Running);
        store.upsert_instance(&instance).await.unwrap();
        (instance, cluster)
    }

    #[tokio::test]
    async fn test_refresh_overwrites_drift() {
        let backend = Arc::new(SimulatedBackend::new());
        let store = Arc::new(InMemoryStore::new());
        let (instance, cluster) = running_instance(&backend, &store).await;
        let probe = ReconciliationProbe::new(backend.clone(), store.clone());

        backend.set_phase(&cluster.namespace, &instance.name, BackendPhase::Failed);
        let refreshed = probe.refresh(instance.clone(), &cluster).await;

        assert_eq!(refreshed.status, InstanceStatus::Failed);
        let stored = store.get_instance(&instance.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InstanceStatus::Failed);
    }

    #[tokio::test]
    async fn test_refresh_serves_stale_on_backend_error() {
        let backend = Arc::new(SimulatedBackend::new());
        let store = Arc::new(InMemoryStore::new());
        let (instance, cluster) = running_instance(&backend, &store).await;
        let probe = ReconciliationProbe::new(backend.clone(), store.clone());

        backend.set_phase(&cluster.namespace, &instance.name, BackendPhase::Failed);
        backend.fail(BackendOp::InstanceStatus, None);

        let refreshed = probe.refresh(instance.clone(), &cluster).await;
        assert_eq!(refreshed.status, InstanceStatus::Running);
        assert_eq!(refreshed.updated_at, instance.updated_at);
    }
}
