//! REST API tests, served in-process against the simulated backend

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cmp_backend::{BackendOp, SimulatedBackend};
use cmp_core::{ClusterOrchestrator, InMemoryStore};
use cmp_daemon::api::{create_router, AppState};
use cmp_daemon::config::ServerConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    backend: Arc<SimulatedBackend>,
}

impl TestApp {
    fn new() -> Self {
        let backend = Arc::new(SimulatedBackend::new());
        let orchestrator =
            ClusterOrchestrator::new(Arc::new(InMemoryStore::new()), backend.clone());
        let app = create_router(
            AppState::new(Arc::new(orchestrator)),
            &ServerConfig::default(),
        );
        Self { app, backend }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, username: &str, token: &str, cpu: f64, memory: f64) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/tenants",
                None,
                Some(json!({
                    "username": username,
                    "token": token,
                    "quota_cpu": cpu,
                    "quota_memory": memory,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    async fn create_cluster(
        &self,
        token: &str,
        name: &str,
        kind: &str,
        count: u32,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/v1/clusters",
            Some(token),
            Some(json!({
                "name": name,
                "kind": kind,
                "cpu_per_instance": 2.0,
                "memory_per_instance": 4.0,
                "instance_count": count,
            })),
        )
        .await
    }
}

#[tokio::test]
async fn health_and_status_need_no_credentials() {
    let t = TestApp::new();

    let (status, body) = t.send("GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = t.send("GET", "/api/v1/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "simulated");
}

#[tokio::test]
async fn registered_tenant_never_echoes_token() {
    let t = TestApp::new();
    let body = t.register("alice", "alice-token", 10.0, 20.0).await;

    assert_eq!(body["username"], "alice");
    assert!(body.get("token").is_none());

    let (status, me) = t
        .send("GET", "/api/v1/tenants/me", Some("alice-token"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], body["id"]);
    assert!(me.get("token").is_none());
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let t = TestApp::new();
    t.register("alice", "alice-token", 10.0, 20.0).await;

    let (status, body) = t
        .send(
            "POST",
            "/api/v1/tenants",
            None,
            Some(json!({
                "username": "alice",
                "token": "other",
                "quota_cpu": 1.0,
                "quota_memory": 1.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let t = TestApp::new();
    t.register("alice", "alice-token", 10.0, 20.0).await;

    let (status, body) = t.send("GET", "/api/v1/clusters", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = t.send("GET", "/api/v1/clusters", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn quota_is_reserved_and_enforced() {
    let t = TestApp::new();
    t.register("alice", "tok", 10.0, 20.0).await;

    let (status, created) = t.create_cluster("tok", "web", "container", 4).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["running"], 4);
    assert_eq!(created["instances"].as_array().unwrap().len(), 4);

    let (_, quota) = t
        .send("GET", "/api/v1/tenants/me/quota", Some("tok"), None)
        .await;
    assert_eq!(quota["used_cpu"], 8.0);
    assert_eq!(quota["used_memory"], 16.0);
    assert_eq!(quota["available_cpu"], 2.0);

    let calls_before = t.backend.call_count();
    let (status, body) = t.create_cluster("tok", "more", "container", 2).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "QUOTA_EXCEEDED");
    assert_eq!(body["details"]["requested"]["cpu"], 4.0);
    assert_eq!(body["details"]["available"]["cpu"], 2.0);
    assert_eq!(t.backend.call_count(), calls_before);
}

#[tokio::test]
async fn invalid_cluster_requests_are_rejected() {
    let t = TestApp::new();
    t.register("alice", "tok", 10.0, 20.0).await;

    let (status, body) = t.create_cluster("tok", "empty", "container", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    t.create_cluster("tok", "web", "container", 1).await;
    let (status, _) = t.create_cluster("tok", "web", "container", 1).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .send("GET", "/api/v1/clusters/not-a-uuid", Some("tok"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_cluster_looks_missing() {
    let t = TestApp::new();
    t.register("alice", "alice-token", 10.0, 20.0).await;
    t.register("bob", "bob-token", 10.0, 20.0).await;

    let (_, created) = t.create_cluster("alice-token", "web", "vm", 1).await;
    let id = created["cluster"]["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .send("GET", &format!("/api/v1/clusters/{}", id), Some("bob-token"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, detail) = t
        .send("GET", &format!("/api/v1/clusters/{}", id), Some("alice-token"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["instances"][0]["status"], "running");
}

#[tokio::test]
async fn suspend_and_resume_report_batch_counts() {
    let t = TestApp::new();
    t.register("alice", "tok", 10.0, 20.0).await;
    let (_, created) = t.create_cluster("tok", "vms", "vm", 3).await;
    let id = created["cluster"]["id"].as_str().unwrap().to_string();

    let (status, outcome) = t
        .send("POST", &format!("/api/v1/clusters/{}/suspend", id), Some("tok"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({"total": 3, "succeeded": 3, "failed": 0, "skipped": 0}));

    let (_, outcome) = t
        .send("POST", &format!("/api/v1/clusters/{}/suspend", id), Some("tok"), None)
        .await;
    assert_eq!(outcome["skipped"], 3);

    let (_, outcome) = t
        .send("POST", &format!("/api/v1/clusters/{}/resume", id), Some("tok"), None)
        .await;
    assert_eq!(outcome["succeeded"], 3);
}

#[tokio::test]
async fn instance_operations_map_errors_to_status_codes() {
    let t = TestApp::new();
    t.register("alice", "tok", 10.0, 20.0).await;

    let (_, containers) = t.create_cluster("tok", "web", "container", 1).await;
    let container = containers["instances"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = t
        .send(
            "POST",
            &format!("/api/v1/instances/{}/operate", container),
            Some("tok"),
            Some(json!({"operation": "start"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "UNSUPPORTED_OPERATION");

    let (_, vms) = t.create_cluster("tok", "vm", "vm", 1).await;
    let vm = vms["instances"][0]["id"].as_str().unwrap().to_string();
    let vm_name = vms["instances"][0]["name"].as_str().unwrap().to_string();

    let (status, body) = t
        .send(
            "POST",
            &format!("/api/v1/instances/{}/operate", vm),
            Some("tok"),
            Some(json!({"operation": "resume"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
    assert_eq!(body["details"]["actual"], "running");

    t.backend.fail_once(BackendOp::StopInstance, Some(&vm_name));
    let (status, body) = t
        .send(
            "POST",
            &format!("/api/v1/instances/{}/operate", vm),
            Some("tok"),
            Some(json!({"operation": "stop"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "BACKEND_ERROR");

    let (status, transition) = t
        .send(
            "POST",
            &format!("/api/v1/instances/{}/operate", vm),
            Some("tok"),
            Some(json!({"operation": "stop"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transition["previous_status"], "running");
    assert_eq!(transition["new_status"], "stopped");
}

#[tokio::test]
async fn deleting_resources_releases_quota_with_the_cluster() {
    let t = TestApp::new();
    t.register("alice", "tok", 10.0, 20.0).await;
    let (_, created) = t.create_cluster("tok", "web", "container", 2).await;
    let cluster = created["cluster"]["id"].as_str().unwrap().to_string();
    let instance = created["instances"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .send("DELETE", &format!("/api/v1/instances/{}", instance), Some("tok"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t
        .send("GET", &format!("/api/v1/instances/{}", instance), Some("tok"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, quota) = t
        .send("GET", "/api/v1/tenants/me/quota", Some("tok"), None)
        .await;
    assert_eq!(quota["used_cpu"], 4.0);

    let (status, deletion) = t
        .send("DELETE", &format!("/api/v1/clusters/{}", cluster), Some("tok"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deletion["instances_deleted"], 1);
    assert_eq!(deletion["namespace"], "web-ns");
    assert_eq!(deletion["released"]["cpu"], 4.0);

    let (_, quota) = t
        .send("GET", "/api/v1/tenants/me/quota", Some("tok"), None)
        .await;
    assert_eq!(quota["used_cpu"], 0.0);
    assert_eq!(quota["used_memory"], 0.0);
}
