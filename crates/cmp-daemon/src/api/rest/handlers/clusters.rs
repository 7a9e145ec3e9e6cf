//! Cluster management handlers

use super::parse_id;
use crate::api::rest::auth::Authenticated;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cmp_types::{
    BatchOutcome, Cluster, ClusterCreation, ClusterDeletion, ClusterDetail, ClusterId,
    ClusterSpec,
};

/// Provision a cluster
pub async fn create_cluster(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Json(spec): Json<ClusterSpec>,
) -> ApiResult<(StatusCode, Json<ClusterCreation>)> {
    let created = state.orchestrator.create_cluster(&tenant.id, spec).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List the caller's clusters
pub async fn list_clusters(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Cluster>>> {
    let clusters = state.orchestrator.list_clusters(&tenant.id).await?;
    Ok(Json(clusters))
}

/// Get a cluster with freshly reconciled members
pub async fn get_cluster(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClusterDetail>> {
    let cluster_id: ClusterId = parse_id(&id)?;
    let detail = state.orchestrator.get_cluster(&tenant.id, &cluster_id).await?;
    Ok(Json(detail))
}

/// Tear a cluster down and release its reservation
pub async fn delete_cluster(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClusterDeletion>> {
    let cluster_id: ClusterId = parse_id(&id)?;
    let deletion = state
        .orchestrator
        .delete_cluster(&tenant.id, &cluster_id)
        .await?;
    Ok(Json(deletion))
}

/// Suspend every running member
pub async fn suspend_cluster(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchOutcome>> {
    let cluster_id: ClusterId = parse_id(&id)?;
    let outcome = state
        .orchestrator
        .suspend_cluster(&tenant.id, &cluster_id)
        .await?;
    Ok(Json(outcome))
}

/// Resume every suspended member
pub async fn resume_cluster(
    Authenticated(tenant): Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchOutcome>> {
    let cluster_id: ClusterId = parse_id(&id)?;
    let outcome = state
        .orchestrator
        .resume_cluster(&tenant.id, &cluster_id)
        .await?;
    Ok(Json(outcome))
}
