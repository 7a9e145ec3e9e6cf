//! Tenant administration handlers

use crate::api::rest::auth::Authenticated;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, http::StatusCode, Json};
use cmp_core::NewTenant;
use cmp_types::{QuotaSummary, Tenant, TenantId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Register tenant request
#[derive(Debug, Deserialize)]
pub struct RegisterTenantRequest {
    pub username: String,
    pub token: String,
    pub quota_cpu: f64,
    pub quota_memory: f64,
}

impl From<RegisterTenantRequest> for NewTenant {
    fn from(req: RegisterTenantRequest) -> Self {
        NewTenant {
            username: req.username,
            token: req.token,
            quota_cpu: req.quota_cpu,
            quota_memory: req.quota_memory,
        }
    }
}

/// Tenant as exposed over the API; the bearer token is never echoed back
#[derive(Debug, Serialize, Deserialize)]
pub struct TenantView {
    pub id: TenantId,
    pub username: String,
    pub quota_cpu: f64,
    pub quota_memory: f64,
    pub used_cpu: f64,
    pub used_memory: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Tenant> for TenantView {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            username: tenant.username,
            quota_cpu: tenant.quota_cpu,
            quota_memory: tenant.quota_memory,
            used_cpu: tenant.used_cpu,
            used_memory: tenant.used_memory,
            created_at: tenant.created_at,
        }
    }
}

/// Register a new tenant
pub async fn register_tenant(
    State(state): State<AppState>,
    Json(req): Json<RegisterTenantRequest>,
) -> ApiResult<(StatusCode, Json<TenantView>)> {
    let tenant = state.orchestrator.register_tenant(req.into()).await?;
    info!(tenant_id = %tenant.id, username = %tenant.username, "Tenant registered via API");
    Ok((StatusCode::CREATED, Json(tenant.into())))
}

/// List all tenants
pub async fn list_tenants(
    Authenticated(_caller): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TenantView>>> {
    let tenants = state.orchestrator.list_tenants().await?;
    Ok(Json(tenants.into_iter().map(TenantView::from).collect()))
}

/// The calling tenant
pub async fn current_tenant(Authenticated(tenant): Authenticated) -> Json<TenantView> {
    Json(tenant.into())
}

/// Quota summary of the calling tenant
pub async fn quota_summary(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<QuotaSummary>> {
    let summary = state.orchestrator.quota_summary(&tenant.id).await?;
    Ok(Json(summary))
}
