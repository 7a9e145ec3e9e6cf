//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::daemon_status))
        // Tenants
        .route(
            "/tenants",
            post(handlers::register_tenant).get(handlers::list_tenants),
        )
        .route("/tenants/me", get(handlers::current_tenant))
        .route("/tenants/me/quota", get(handlers::quota_summary))
        // Clusters
        .route(
            "/clusters",
            post(handlers::create_cluster).get(handlers::list_clusters),
        )
        .route(
            "/clusters/:id",
            get(handlers::get_cluster).delete(handlers::delete_cluster),
        )
        .route("/clusters/:id/suspend", post(handlers::suspend_cluster))
        .route("/clusters/:id/resume", post(handlers::resume_cluster))
        // Instances
        .route(
            "/instances/:id",
            get(handlers::get_instance).delete(handlers::delete_instance),
        )
        .route("/instances/:id/operate", post(handlers::operate_instance));

    // Build router with middleware
    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}
