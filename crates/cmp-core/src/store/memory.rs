//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use cmp_types::{Cluster, ClusterId, Instance, InstanceId, Tenant, TenantId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tenants: Arc<RwLock<HashMap<TenantId, Tenant>>>,
    clusters: Arc<RwLock<HashMap<ClusterId, Cluster>>>,
    instances: Arc<RwLock<HashMap<InstanceId, Instance>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of instance records across all clusters
    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Total number of cluster records across all tenants
    pub async fn cluster_count(&self) -> usize {
        self.clusters.read().await.len()
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn get_tenant(&self, id: &TenantId) -> StorageResult<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(id).cloned())
    }

    async fn get_tenant_by_username(&self, username: &str) -> StorageResult<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().find(|t| t.username == username).cloned())
    }

    async fn get_tenant_by_token(&self, token: &str) -> StorageResult<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().find(|t| t.token == token).cloned())
    }

    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>> {
        let tenants = self.tenants.read().await;
        let mut all: Vec<Tenant> = tenants.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> StorageResult<()> {
        let mut tenants = self.tenants.write().await;
        if tenants.values().any(|t| t.username == tenant.username) {
            return Err(StorageError::Conflict(format!(
                "username '{}' is taken",
                tenant.username
            )));
        }
        if tenants.values().any(|t| t.token == tenant.token) {
            return Err(StorageError::Conflict("token is already in use".into()));
        }
        tenants.insert(tenant.id, tenant);
        Ok(())
    }

    async fn update_tenant(&self, tenant: &Tenant) -> StorageResult<()> {
        let mut tenants = self.tenants.write().await;
        match tenants.get_mut(&tenant.id) {
            Some(existing) => {
                *existing = tenant.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("Tenant {}", tenant.id))),
        }
    }
}

#[async_trait]
impl ClusterStore for InMemoryStore {
    async fn get_cluster(&self, id: &ClusterId) -> StorageResult<Option<Cluster>> {
        let clusters = self.clusters.read().await;
        Ok(clusters.get(id).cloned())
    }

    async fn get_cluster_by_name(&self, name: &str) -> StorageResult<Option<Cluster>> {
        let clusters = self.clusters.read().await;
        Ok(clusters.values().find(|c| c.name == name).cloned())
    }

    async fn list_clusters_for_tenant(&self, tenant_id: &TenantId) -> StorageResult<Vec<Cluster>> {
        let clusters = self.clusters.read().await;
        let mut owned: Vec<Cluster> = clusters
            .values()
            .filter(|c| &c.tenant_id == tenant_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(owned)
    }

    async fn insert_cluster(&self, cluster: Cluster) -> StorageResult<()> {
        let mut clusters = self.clusters.write().await;
        if clusters
            .values()
            .any(|c| c.name == cluster.name || c.namespace == cluster.namespace)
        {
            return Err(StorageError::Conflict(format!(
                "cluster '{}' already exists",
                cluster.name
            )));
        }
        clusters.insert(cluster.id, cluster);
        Ok(())
    }

    async fn delete_cluster(&self, id: &ClusterId) -> StorageResult<bool> {
        let mut clusters = self.clusters.write().await;
        let mut instances = self.instances.write().await;
        let removed = clusters.remove(id).is_some();
        instances.retain(|_, i| &i.cluster_id != id);
        Ok(removed)
    }
}

#[async_trait]
impl InstanceStore for InMemoryStore {
    async fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<Instance>> {
        let instances = self.instances.read().await;
        Ok(instances.get(id).cloned())
    }

    async fn list_instances_for_cluster(
        &self,
        cluster_id: &ClusterId,
    ) -> StorageResult<Vec<Instance>> {
        let instances = self.instances.read().await;
        let mut members: Vec<Instance> = instances
            .values()
            .filter(|i| &i.cluster_id == cluster_id)
            .cloned()
            .collect();
        members.sort_by_key(|i| i.index);
        Ok(members)
    }

    async fn upsert_instance(&self, instance: &Instance) -> StorageResult<()> {
        let mut instances = self.instances.write().await;
        instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn delete_instance(&self, id: &InstanceId) -> StorageResult<bool> {
        let mut instances = self.instances.write().await;
        Ok(instances.remove(id).is_some())
    }
}
