//! Cluster orchestrator
//!
//! The single entry point for tenant, cluster and instance operations. It
//! composes the quota ledger, the instance state machine and the
//! reconciliation probe over one store and one compute backend, both
//! injected at construction.
//!
//! ## Quota policy
//!
//! A cluster reserves `cpu_per_instance × instance_count` (and the same for
//! memory) as one block. The block is applied after every instance has been
//! attempted, whether or not each attempt succeeded, and released as one
//! block when the cluster is deleted. Failed instances are not refunded.
//!
//! Cluster creation and deletion run on their own task. Dropping the caller
//! (a request timeout, a disconnected client) does not stop them halfway, so
//! a cluster record and its reservation are always written or removed
//! together.

use crate::error::{FleetError, Result};
use crate::identity::{IdentityStore, StoreIdentity};
use crate::lifecycle::InstanceLifecycle;
use crate::probe::ReconciliationProbe;
use crate::quota::QuotaLedger;
use crate::store::{ClusterStore, FleetStore, InstanceStore, TenantStore};
use crate::StorageError;
use cmp_backend::ComputeBackend;
use cmp_types::{
    BatchOutcome, Cluster, ClusterCreation, ClusterDeletion, ClusterDetail, ClusterId,
    ClusterSpec, Instance, InstanceId, InstanceOperation, InstanceStatus, InstanceTransition,
    QuotaSummary, Tenant, TenantId,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Tenant registration request
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub username: String,
    pub token: String,
    pub quota_cpu: f64,
    pub quota_memory: f64,
}

#[derive(Clone)]
pub struct ClusterOrchestrator {
    tenants: Arc<dyn TenantStore>,
    clusters: Arc<dyn ClusterStore>,
    instances: Arc<dyn InstanceStore>,
    backend: Arc<dyn ComputeBackend>,
    ledger: QuotaLedger,
    lifecycle: InstanceLifecycle,
    probe: ReconciliationProbe,
    identity: StoreIdentity,
}

impl ClusterOrchestrator {
    pub fn new<S>(store: Arc<S>, backend: Arc<dyn ComputeBackend>) -> Self
    where
        S: FleetStore + 'static,
    {
        let tenants: Arc<dyn TenantStore> = store.clone();
        let clusters: Arc<dyn ClusterStore> = store.clone();
        let instances: Arc<dyn InstanceStore> = store;

        Self {
            ledger: QuotaLedger::new(tenants.clone()),
            lifecycle: InstanceLifecycle::new(backend.clone(), instances.clone()),
            probe: ReconciliationProbe::new(backend.clone(), instances.clone()),
            identity: StoreIdentity::new(tenants.clone()),
            tenants,
            clusters,
            instances,
            backend,
        }
    }

    /// Name of the compute backend in use
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Resolve a bearer credential
    pub async fn authenticate(&self, token: &str) -> Result<Tenant> {
        self.identity.resolve(token).await
    }

    // ========== Tenants ==========

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register_tenant(&self, request: NewTenant) -> Result<Tenant> {
        if request.username.trim().is_empty() {
            return Err(FleetError::InvalidRequest("username cannot be empty".into()));
        }
        if request.token.is_empty() {
            return Err(FleetError::InvalidRequest("token cannot be empty".into()));
        }
        for (field, value) in [
            ("quota_cpu", request.quota_cpu),
            ("quota_memory", request.quota_memory),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(FleetError::InvalidRequest(format!("{} must be > 0", field)));
            }
        }

        let tenant = Tenant::new(
            request.username,
            request.token,
            request.quota_cpu,
            request.quota_memory,
        );
        self.tenants
            .insert_tenant(tenant.clone())
            .await
            .map_err(|e| match e {
                StorageError::Conflict(msg) => FleetError::AlreadyExists(msg),
                other => other.into(),
            })?;

        info!(tenant_id = %tenant.id, "Tenant registered");
        Ok(tenant)
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        Ok(self.tenants.list_tenants().await?)
    }

    /// Current record of a tenant
    pub async fn tenant(&self, tenant_id: &TenantId) -> Result<Tenant> {
        self.ledger.current(tenant_id).await
    }

    pub async fn quota_summary(&self, tenant_id: &TenantId) -> Result<QuotaSummary> {
        Ok(self.ledger.current(tenant_id).await?.summary())
    }

    // ========== Clusters ==========

    /// Provision a cluster of `instance_count` identical instances.
    ///
    /// Authorization is evaluated once against the whole batch. A denial
    /// leaves no trace on the backend or in the store. Once the namespace
    /// exists, individual instance failures only mark that instance failed.
    pub async fn create_cluster(
        &self,
        tenant_id: &TenantId,
        spec: ClusterSpec,
    ) -> Result<ClusterCreation> {
        let this = self.clone();
        let tenant_id = *tenant_id;
        run_detached(async move { this.create_cluster_inner(&tenant_id, spec).await }).await
    }

    #[instrument(skip(self, spec), fields(tenant_id = %tenant_id, cluster = %spec.name))]
    async fn create_cluster_inner(
        &self,
        tenant_id: &TenantId,
        spec: ClusterSpec,
    ) -> Result<ClusterCreation> {
        spec.validate()?;

        if self.clusters.get_cluster_by_name(&spec.name).await?.is_some() {
            return Err(FleetError::AlreadyExists(format!("Cluster '{}'", spec.name)));
        }

        let _guard = self.ledger.lock(tenant_id).await;
        let tenant = self.ledger.current(tenant_id).await?;
        let reservation = spec.total();
        self.ledger.require(&tenant, reservation)?;

        let cluster = Cluster::from_spec(&spec, tenant.id);
        self.ensure_namespace(&cluster.namespace).await?;

        self.clusters
            .insert_cluster(cluster.clone())
            .await
            .map_err(|e| match e {
                StorageError::Conflict(_) => {
                    FleetError::AlreadyExists(format!("Cluster '{}'", cluster.name))
                }
                other => other.into(),
            })?;

        let provisioned = self.provision_instances(&cluster).await;

        // The reservation follows the cluster record, even if provisioning
        // stopped early on a storage error.
        self.ledger.apply(&tenant.id, reservation).await?;
        let instances = provisioned?;

        let running = instances
            .iter()
            .filter(|i| i.status == InstanceStatus::Running)
            .count();

        info!(
            cluster_id = %cluster.id,
            instances = instances.len(),
            running,
            "Cluster created"
        );

        Ok(ClusterCreation {
            cluster,
            instances,
            running,
            reserved: reservation,
        })
    }

    async fn provision_instances(&self, cluster: &Cluster) -> Result<Vec<Instance>> {
        let mut instances = Vec::with_capacity(cluster.instance_count as usize);
        for index in 0..cluster.instance_count {
            let instance = Instance::pending(cluster, index);
            instances.push(self.lifecycle.create(instance, cluster).await?);
        }
        Ok(instances)
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        match self.backend.create_namespace(namespace).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_exists() => {
                debug!(namespace, "Namespace already exists");
                Ok(())
            }
            Err(e) => {
                error!(namespace, error = %e, "Namespace creation failed");
                Err(e.into())
            }
        }
    }

    pub async fn list_clusters(&self, tenant_id: &TenantId) -> Result<Vec<Cluster>> {
        Ok(self.clusters.list_clusters_for_tenant(tenant_id).await?)
    }

    /// A cluster and its instances, refreshed from the backend
    pub async fn get_cluster(
        &self,
        tenant_id: &TenantId,
        cluster_id: &ClusterId,
    ) -> Result<ClusterDetail> {
        let cluster = self.owned_cluster(tenant_id, cluster_id).await?;
        let members = self.instances.list_instances_for_cluster(&cluster.id).await?;
        let instances = self.probe.refresh_all(members, &cluster).await;
        Ok(ClusterDetail { cluster, instances })
    }

    /// Tear a cluster down and release its full reservation
    pub async fn delete_cluster(
        &self,
        tenant_id: &TenantId,
        cluster_id: &ClusterId,
    ) -> Result<ClusterDeletion> {
        let this = self.clone();
        let (tenant_id, cluster_id) = (*tenant_id, *cluster_id);
        run_detached(async move { this.delete_cluster_inner(&tenant_id, &cluster_id).await })
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, cluster_id = %cluster_id))]
    async fn delete_cluster_inner(
        &self,
        tenant_id: &TenantId,
        cluster_id: &ClusterId,
    ) -> Result<ClusterDeletion> {
        let _guard = self.ledger.lock(tenant_id).await;
        let cluster = self.owned_cluster(tenant_id, cluster_id).await?;

        let members = self.instances.list_instances_for_cluster(&cluster.id).await?;
        let mut backend_failures = 0;
        for instance in &members {
            if !self.lifecycle.delete(instance, &cluster).await? {
                backend_failures += 1;
            }
        }

        match self.backend.delete_namespace(&cluster.namespace).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(namespace = %cluster.namespace, "Namespace already gone");
            }
            Err(e) => {
                warn!(namespace = %cluster.namespace, error = %e, "Namespace deletion failed");
                backend_failures += 1;
            }
        }

        self.clusters.delete_cluster(&cluster.id).await?;

        let released = cluster.reservation();
        self.ledger.apply(&cluster.tenant_id, -released).await?;

        info!(
            instances = members.len(),
            backend_failures,
            "Cluster deleted"
        );

        Ok(ClusterDeletion {
            instances_deleted: members.len(),
            backend_failures,
            namespace: cluster.namespace,
            released,
        })
    }

    /// Suspend every running member
    pub async fn suspend_cluster(
        &self,
        tenant_id: &TenantId,
        cluster_id: &ClusterId,
    ) -> Result<BatchOutcome> {
        self.operate_cluster(tenant_id, cluster_id, InstanceOperation::Suspend)
            .await
    }

    /// Resume every suspended member
    pub async fn resume_cluster(
        &self,
        tenant_id: &TenantId,
        cluster_id: &ClusterId,
    ) -> Result<BatchOutcome> {
        self.operate_cluster(tenant_id, cluster_id, InstanceOperation::Resume)
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, cluster_id = %cluster_id, operation = %operation))]
    async fn operate_cluster(
        &self,
        tenant_id: &TenantId,
        cluster_id: &ClusterId,
        operation: InstanceOperation,
    ) -> Result<BatchOutcome> {
        let cluster = self.owned_cluster(tenant_id, cluster_id).await?;
        let members = self.instances.list_instances_for_cluster(&cluster.id).await?;
        let required = operation.required_status();

        let mut outcome = BatchOutcome::default();
        for instance in members {
            if instance.status != required {
                debug!(instance = %instance.name, status = %instance.status, "Skipping");
                outcome.record_skip();
                continue;
            }

            let name = instance.name.clone();
            match self.lifecycle.operate(instance, &cluster, operation).await {
                Ok(_) => outcome.record_success(),
                Err(e) => {
                    error!(instance = %name, error = %e, "Batch member failed");
                    outcome.record_failure();
                }
            }
        }

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "Cluster {} finished",
            operation
        );
        Ok(outcome)
    }

    // ========== Instances ==========

    /// An instance, refreshed from the backend
    pub async fn get_instance(
        &self,
        tenant_id: &TenantId,
        instance_id: &InstanceId,
    ) -> Result<Instance> {
        let (instance, cluster) = self.owned_instance(tenant_id, instance_id).await?;
        Ok(self.probe.refresh(instance, &cluster).await)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, instance_id = %instance_id, operation = %operation))]
    pub async fn operate_instance(
        &self,
        tenant_id: &TenantId,
        instance_id: &InstanceId,
        operation: InstanceOperation,
    ) -> Result<InstanceTransition> {
        let (instance, cluster) = self.owned_instance(tenant_id, instance_id).await?;
        self.lifecycle.operate(instance, &cluster, operation).await
    }

    /// Remove one instance. Its share of the quota stays with the cluster.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, instance_id = %instance_id))]
    pub async fn delete_instance(
        &self,
        tenant_id: &TenantId,
        instance_id: &InstanceId,
    ) -> Result<()> {
        let (instance, cluster) = self.owned_instance(tenant_id, instance_id).await?;
        self.lifecycle.delete(&instance, &cluster).await?;
        info!(instance = %instance.name, "Instance deleted");
        Ok(())
    }

    // ========== Ownership ==========

    /// Foreign clusters are reported exactly like missing ones
    async fn owned_cluster(&self, tenant_id: &TenantId, cluster_id: &ClusterId) -> Result<Cluster> {
        self.clusters
            .get_cluster(cluster_id)
            .await?
            .filter(|c| &c.tenant_id == tenant_id)
            .ok_or_else(|| FleetError::cluster_not_found(cluster_id))
    }

    async fn owned_instance(
        &self,
        tenant_id: &TenantId,
        instance_id: &InstanceId,
    ) -> Result<(Instance, Cluster)> {
        let instance = self
            .instances
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| FleetError::instance_not_found(instance_id))?;

        let cluster = self
            .owned_cluster(tenant_id, &instance.cluster_id)
            .await
            .map_err(|_| FleetError::instance_not_found(instance_id))?;

        Ok((instance, cluster))
    }
}

/// Drive `work` to completion on its own task. The caller may stop waiting,
/// the work itself keeps going.
async fn run_detached<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match tokio::spawn(work.in_current_span()).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(FleetError::Interrupted(e.to_string())),
    }
}
