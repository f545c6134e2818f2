//! HTTP API for the orchestrator.
//!
//! | Method | Path | |
//! |---|---|---|
//! | `POST` | `/api/v1/scan` | submit, `202 {scan_id}` |
//! | `GET` | `/api/v1/scan/{scan_id}/status` | job snapshot |
//! | `GET` | `/api/v1/scan/{scan_id}/results` | findings, `409` while running |
//! | `GET` | `/api/v1/plugins` | registered plugins |
//! | `GET` | `/health` | liveness |

mod error;
mod handlers;
mod models;

pub use error::ApiError;
pub use models::{
    ErrorResponse, ScanAccepted, ScanRequest, ScanResultsResponse, ScanStatusResponse,
};

use crate::orchestrator::ScanOrchestrator;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The orchestrator serving every request.
    pub orchestrator: Arc<ScanOrchestrator>,
}

impl AppState {
    /// Creates handler state around `orchestrator`.
    pub fn new(orchestrator: Arc<ScanOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Builds the application router.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let api_routes = Router::new()
        .route("/scan", post(handlers::submit_scan))
        .route("/scan/{scan_id}/status", get(handlers::scan_status))
        .route("/scan/{scan_id}/results", get(handlers::scan_results))
        .route("/plugins", get(handlers::list_plugins));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HealthStatus, JobStatus, ScanType, Severity};
    use crate::plugins::MockPlugin;
    use crate::registry::{PluginDescriptor, PluginRegistry};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> (Router, Arc<ScanOrchestrator>) {
        let registry = Arc::new(PluginRegistry::new());
        registry.register_plugin(
            PluginDescriptor::new("slither", "http://slither:8080")
                .with_scan_type(ScanType::Static)
                .with_health(HealthStatus::Healthy),
            MockPlugin::new("slither").with_finding("reentrancy", Severity::High, "line 42", 0.9),
        );
        registry.register_plugin(
            PluginDescriptor::new("manticore", "http://manticore:8080")
                .with_scan_type(ScanType::Dynamic)
                .with_health(HealthStatus::Healthy),
            MockPlugin::new("manticore").with_latency(Duration::from_secs(30)),
        );

        let orchestrator = ScanOrchestrator::builder().with_registry(registry).build();
        let router = create_router(
            AppState::new(Arc::clone(&orchestrator)),
            Duration::from_secs(5),
        );
        (router, orchestrator)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_scan(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/scan")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app();
        let (status, body) = send(router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_submit_then_fetch_results() {
        let (router, orchestrator) = app();

        let (status, body) = send(
            router.clone(),
            post_scan(serde_json::json!({
                "target_identifier": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                "target_type": "address",
                "scan_type": "static"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let scan_id: Uuid = body["scan_id"].as_str().unwrap().parse().unwrap();

        orchestrator.wait_for_completion(scan_id).await.unwrap();

        let (status, body) = send(
            router.clone(),
            get(&format!("/api/v1/scan/{}/status", scan_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["per_plugin_results"]["slither"]["outcome"], "findings");

        let (status, body) = send(router, get(&format!("/api/v1/scan/{}/results", scan_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["findings"][0]["vulnerability_type"], "reentrancy");
        assert_eq!(body["findings"][0]["severity"], 3);
        assert_eq!(body["summary"]["total"], 1);
    }

    #[tokio::test]
    async fn test_results_conflict_while_running() {
        let (router, orchestrator) = app();

        let (status, body) = send(
            router.clone(),
            post_scan(serde_json::json!({
                "target_identifier": "0xABC",
                "target_type": "address",
                "scan_type": "dynamic"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "running");

        let scan_id: Uuid = body["scan_id"].as_str().unwrap().parse().unwrap();
        let (status, body) = send(router, get(&format!("/api/v1/scan/{}/results", scan_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("running"));
        assert_eq!(
            orchestrator.get_status(scan_id).unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn test_unknown_scan_is_404() {
        let (router, _) = app();
        let (status, body) = send(
            router,
            get(&format!("/api/v1/scan/{}/status", Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_scan_id_is_400() {
        let (router, _) = app();
        let (status, _) = send(router, get("/api/v1/scan/not-a-uuid/results")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_requests_are_400() {
        let (router, _) = app();

        let (status, body) = send(
            router.clone(),
            post_scan(serde_json::json!({
                "target_identifier": "",
                "target_type": "address",
                "scan_type": "static"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("identifier"));

        let (status, body) = send(
            router,
            post_scan(serde_json::json!({
                "target_identifier": "0xABC",
                "target_type": "address",
                "scan_type": "quantum"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_oversized_timeout_is_400() {
        let (router, orchestrator) = app();
        let (status, body) = send(
            router,
            post_scan(serde_json::json!({
                "target_identifier": "0xABC",
                "target_type": "address",
                "scan_type": "static",
                "timeout_seconds": u64::MAX
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("timeout_seconds"));
        assert!(orchestrator.list_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_extremes_are_accepted() {
        let (router, orchestrator) = app();

        for max_concurrency in [0, usize::MAX] {
            let (status, body) = send(
                router.clone(),
                post_scan(serde_json::json!({
                    "target_identifier": "0xABC",
                    "target_type": "address",
                    "scan_type": "static",
                    "max_concurrency": max_concurrency
                })),
            )
            .await;
            assert_eq!(status, StatusCode::ACCEPTED);

            let scan_id: Uuid = body["scan_id"].as_str().unwrap().parse().unwrap();
            let job = orchestrator.wait_for_completion(scan_id).await.unwrap();
            assert_eq!(job.status, JobStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_list_plugins() {
        let (router, _) = app();
        let (status, body) = send(router, get("/api/v1/plugins")).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["slither", "manticore"]);
        assert_eq!(body[0]["health_status"], "healthy");
    }
}
