//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use cmp_types::{Cluster, ClusterId, Instance, InstanceId, Tenant, TenantId};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Combined storage trait
#[async_trait]
pub trait FleetStore: TenantStore + ClusterStore + InstanceStore + Send + Sync {}

impl<T> FleetStore for T where T: TenantStore + ClusterStore + InstanceStore + Send + Sync {}

/// Storage for tenants
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get_tenant(&self, id: &TenantId) -> StorageResult<Option<Tenant>>;

    async fn get_tenant_by_username(&self, username: &str) -> StorageResult<Option<Tenant>>;

    /// Look a tenant up by bearer credential
    async fn get_tenant_by_token(&self, token: &str) -> StorageResult<Option<Tenant>>;

    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>>;

    /// Insert a new tenant; `Conflict` if the username or token is taken
    async fn insert_tenant(&self, tenant: Tenant) -> StorageResult<()>;

    /// Overwrite an existing tenant; `NotFound` if it does not exist
    async fn update_tenant(&self, tenant: &Tenant) -> StorageResult<()>;
}

/// Storage for clusters
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_cluster(&self, id: &ClusterId) -> StorageResult<Option<Cluster>>;

    async fn get_cluster_by_name(&self, name: &str) -> StorageResult<Option<Cluster>>;

    async fn list_clusters_for_tenant(&self, tenant_id: &TenantId) -> StorageResult<Vec<Cluster>>;

    /// Insert a new cluster; `Conflict` if the name or namespace is taken
    async fn insert_cluster(&self, cluster: Cluster) -> StorageResult<()>;

    /// Delete a cluster together with all of its instance records
    async fn delete_cluster(&self, id: &ClusterId) -> StorageResult<bool>;
}

/// Storage for instances
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<Instance>>;

    /// Instances of a cluster, ordered by index
    async fn list_instances_for_cluster(&self, cluster_id: &ClusterId)
        -> StorageResult<Vec<Instance>>;

    /// Create or update an instance
    async fn upsert_instance(&self, instance: &Instance) -> StorageResult<()>;

    async fn delete_instance(&self, id: &InstanceId) -> StorageResult<bool>;
}
