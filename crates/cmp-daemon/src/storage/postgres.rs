//! PostgreSQL storage implementation

use async_trait::async_trait;
use cmp_core::{ClusterStore, InstanceStore, StorageError, StorageResult, TenantStore};
use cmp_types::{Cluster, ClusterId, Instance, InstanceId, Tenant, TenantId};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::time::Duration;
use tracing::info;

/// PostgreSQL-backed fleet storage.
///
/// Each record is kept whole in a JSONB `data` column; the columns that carry
/// uniqueness or ordering constraints are duplicated next to it.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.initialize_schema().await?;
        info!(max_connections, "Connected to PostgreSQL");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS tenants (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                token TEXT NOT NULL UNIQUE,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS clusters (
                id UUID PRIMARY KEY,
                tenant_id UUID NOT NULL REFERENCES tenants(id),
                name TEXT NOT NULL UNIQUE,
                namespace TEXT NOT NULL UNIQUE,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS clusters_tenant_id ON clusters(tenant_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS instances (
                id UUID PRIMARY KEY,
                cluster_id UUID NOT NULL REFERENCES clusters(id) ON DELETE CASCADE,
                name TEXT NOT NULL UNIQUE,
                idx BIGINT NOT NULL,
                status TEXT NOT NULL,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS instances_cluster_id ON instances(cluster_id, idx);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, StorageError> {
        serde_json::to_value(value)
            .map_err(|e| StorageError::InvalidData(format!("json serialize error: {}", e)))
    }

    fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, StorageError> {
        serde_json::from_value(value)
            .map_err(|e| StorageError::InvalidData(format!("json deserialize error: {}", e)))
    }

    fn decode<T: serde::de::DeserializeOwned>(row: PgRow) -> Result<T, StorageError> {
        let data: Value = row
            .try_get("data")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Self::from_json(data)
    }

    fn decode_all<T: serde::de::DeserializeOwned>(rows: Vec<PgRow>) -> StorageResult<Vec<T>> {
        rows.into_iter().map(Self::decode).collect()
    }
}

/// Unique violations become `Conflict`, everything else is a query failure
fn write_error(err: sqlx::Error, what: &str) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::Conflict(format!("{} already exists", what))
        }
        _ => StorageError::Query(err.to_string()),
    }
}

fn query_error(err: sqlx::Error) -> StorageError {
    StorageError::Query(err.to_string())
}

#[async_trait]
impl TenantStore for PostgresStore {
    async fn get_tenant(&self, id: &TenantId) -> StorageResult<Option<Tenant>> {
        let row = sqlx::query("SELECT data FROM tenants WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.map(Self::decode).transpose()
    }

    async fn get_tenant_by_username(&self, username: &str) -> StorageResult<Option<Tenant>> {
        let row = sqlx::query("SELECT data FROM tenants WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.map(Self::decode).transpose()
    }

    async fn get_tenant_by_token(&self, token: &str) -> StorageResult<Option<Tenant>> {
        let row = sqlx::query("SELECT data FROM tenants WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.map(Self::decode).transpose()
    }

    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>> {
        let rows = sqlx::query("SELECT data FROM tenants ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        Self::decode_all(rows)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> StorageResult<()> {
        let data = Self::to_json(&tenant)?;

        sqlx::query(
            r#"
            INSERT INTO tenants (id, username, token, data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*tenant.id.as_uuid())
        .bind(&tenant.username)
        .bind(&tenant.token)
        .bind(data)
        .bind(tenant.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("Tenant '{}'", tenant.username)))?;

        Ok(())
    }

    async fn update_tenant(&self, tenant: &Tenant) -> StorageResult<()> {
        let data = Self::to_json(tenant)?;

        let result = sqlx::query(
            r#"
            UPDATE tenants SET username = $2, token = $3, data = $4
            WHERE id = $1
            "#,
        )
        .bind(*tenant.id.as_uuid())
        .bind(&tenant.username)
        .bind(&tenant.token)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("Tenant '{}'", tenant.username)))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Tenant {}", tenant.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for PostgresStore {
    async fn get_cluster(&self, id: &ClusterId) -> StorageResult<Option<Cluster>> {
        let row = sqlx::query("SELECT data FROM clusters WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.map(Self::decode).transpose()
    }

    async fn get_cluster_by_name(&self, name: &str) -> StorageResult<Option<Cluster>> {
        let row = sqlx::query("SELECT data FROM clusters WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.map(Self::decode).transpose()
    }

    async fn list_clusters_for_tenant(&self, tenant_id: &TenantId) -> StorageResult<Vec<Cluster>> {
        let rows = sqlx::query("SELECT data FROM clusters WHERE tenant_id = $1 ORDER BY created_at")
            .bind(*tenant_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        Self::decode_all(rows)
    }

    async fn insert_cluster(&self, cluster: Cluster) -> StorageResult<()> {
        let data = Self::to_json(&cluster)?;

        sqlx::query(
            r#"
            INSERT INTO clusters (id, tenant_id, name, namespace, data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*cluster.id.as_uuid())
        .bind(*cluster.tenant_id.as_uuid())
        .bind(&cluster.name)
        .bind(&cluster.namespace)
        .bind(data)
        .bind(cluster.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("Cluster '{}'", cluster.name)))?;

        Ok(())
    }

    async fn delete_cluster(&self, id: &ClusterId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM clusters WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InstanceStore for PostgresStore {
    async fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<Instance>> {
        let row = sqlx::query("SELECT data FROM instances WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.map(Self::decode).transpose()
    }

    async fn list_instances_for_cluster(
        &self,
        cluster_id: &ClusterId,
    ) -> StorageResult<Vec<Instance>> {
        let rows = sqlx::query("SELECT data FROM instances WHERE cluster_id = $1 ORDER BY idx")
            .bind(*cluster_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        Self::decode_all(rows)
    }

    async fn upsert_instance(&self, instance: &Instance) -> StorageResult<()> {
        let data = Self::to_json(instance)?;

        sqlx::query(
            r#"
            INSERT INTO instances (id, cluster_id, name, idx, status, data, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                data = EXCLUDED.data,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(*instance.id.as_uuid())
        .bind(*instance.cluster_id.as_uuid())
        .bind(&instance.name)
        .bind(i64::from(instance.index))
        .bind(instance.status.as_str())
        .bind(data)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("Instance '{}'", instance.name)))?;

        Ok(())
    }

    async fn delete_instance(&self, id: &InstanceId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM instances WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }
}
