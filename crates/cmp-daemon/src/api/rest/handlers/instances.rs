//! Instance handlers

use super::parse_id;
use crate::api::rest::auth::Authenticated;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cmp_types::{Instance, InstanceId, InstanceOperation, InstanceTransition};
use serde::Deserialize;

/// Operate request: `{"operation": "stop"}`
#[derive(Debug, Deserialize)]
pub struct OperateRequest {
    pub operation: InstanceOperation,
}

/// Get an instance, refreshed from the backend
pub async fn get_instance(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Instance>> {
    let instance_id: InstanceId = parse_id(&id)?;
    let instance = state
        .orchestrator
        .get_instance(&tenant.id, &instance_id)
        .await?;
    Ok(Json(instance))
}

/// Apply a lifecycle operation to one instance
pub async fn operate_instance(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OperateRequest>,
) -> ApiResult<Json<InstanceTransition>> {
    let instance_id: InstanceId = parse_id(&id)?;
    let transition = state
        .orchestrator
        .operate_instance(&tenant.id, &instance_id, req.operation)
        .await?;
    Ok(Json(transition))
}

/// Delete one instance
pub async fn delete_instance(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let instance_id: InstanceId = parse_id(&id)?;
    state
        .orchestrator
        .delete_instance(&tenant.id, &instance_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
