//! API integration tests
//!
//! Drives the real router with `tower::ServiceExt::oneshot`:
//! - Monitor lifecycle over HTTP
//! - Validation and not-found error shapes
//! - Health and metrics endpoints

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use dynamo_sentinel::analyzer::AnalyzerClient;
use dynamo_sentinel::broadcaster::Broadcaster;
use dynamo_sentinel::config::{AlertConfig, AnalyzerConfig, EnhancementConfig};
use dynamo_sentinel::dispatch::AlertDispatcher;
use dynamo_sentinel::enhancement::{EnhancementClient, NodeRegistry};
use dynamo_sentinel::handlers::{
    get_monitor, health_check, health_simple, list_monitors, start_monitor, stop_monitor,
    ws_handler, AppState,
};
use dynamo_sentinel::metrics::{metrics_router, MetricsState};
use dynamo_sentinel::monitor::{MonitorRegistry, PollerContext};

use crate::common::{test_db, MemoryDedupStore};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _tmp: TempDir,
}

/// Build the real router over an in-memory dedup store and a dead analyzer.
/// Poll jobs started through it fail their fetch fast and skip the tick;
/// these tests only exercise the HTTP surface.
async fn test_app() -> TestApp {
    let (db, tmp) = test_db().await;
    let dedup = Arc::new(MemoryDedupStore::new());
    let broadcaster = Arc::new(Broadcaster::new());
    let metrics = Arc::new(MetricsState::new());

    let enhancement_config = EnhancementConfig {
        nodes: vec![],
        enhance_timeout_ms: 500,
        probe_timeout_ms: 500,
        health_check_interval_secs: 60,
    };
    let nodes = Arc::new(NodeRegistry::new(&enhancement_config));

    let ctx = Arc::new(PollerContext {
        dedup: dedup.clone(),
        analyzer: AnalyzerClient::new(&AnalyzerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 200,
        }),
        enhancement: EnhancementClient::new(nodes.clone(), &enhancement_config, None),
        dispatcher: AlertDispatcher::new(
            &AlertConfig {
                webhook_timeout_ms: 500,
            },
            broadcaster.clone(),
            None,
        ),
        history: db.clone(),
        activity_limit: 5,
        risk_threshold: 60.0,
        dedup_ttl: Duration::from_secs(3600),
        metrics: None,
    });

    let monitors = Arc::new(MonitorRegistry::new(
        ctx,
        Duration::from_secs(3600),
        "mainnet-beta",
    ));

    let state = Arc::new(AppState {
        db,
        dedup,
        broadcaster,
        monitors,
        nodes,
        started_at: Utc::now(),
    });

    let api_routes = Router::new()
        .route("/monitors", post(start_monitor).get(list_monitors))
        .route("/monitors/:monitor_id", get(get_monitor).delete(stop_monitor))
        .route("/health", get(health_check))
        .with_state(state.clone());

    let root_routes = Router::new()
        .route("/health", get(health_simple))
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .merge(root_routes)
        .merge(metrics_router().with_state(metrics));

    TestApp {
        router,
        state,
        _tmp: tmp,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_monitor_request(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/monitors")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

// =============================================================================
// MONITOR LIFECYCLE TESTS
// =============================================================================

/// Starting a monitor returns 201 with the camelCase monitor body
#[tokio::test]
async fn test_start_monitor_returns_created() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_monitor_request(json!({
            "monitorId": "treasury-watch",
            "address": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
            "webhookUrl": "https://hooks.example.com/sec"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["monitorId"], "treasury-watch");
    assert_eq!(json["network"], "mainnet-beta");
    assert_eq!(json["status"], "active");
    assert_eq!(json["webhookUrl"], "https://hooks.example.com/sec");
    assert!(json.get("startedAt").is_some());

    assert_eq!(app.state.monitors.len(), 1);
}

/// Full lifecycle: start, inspect, list, stop, gone
#[tokio::test]
async fn test_monitor_lifecycle_over_http() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_monitor_request(
            json!({"monitorId": "m-1", "address": "addr-1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Inspect
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/monitors/m-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["address"], "addr-1");
    assert_eq!(json["scheduled"], true);

    // List
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/monitors")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    // Stop
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/monitors/m-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "inactive");

    // Gone
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/monitors/m-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Re-posting an existing id replaces the monitor instead of duplicating it
#[tokio::test]
async fn test_start_same_id_replaces_monitor() {
    let app = test_app().await;

    for address in ["addr-old", "addr-new"] {
        let response = app
            .router
            .clone()
            .oneshot(post_monitor_request(
                json!({"monitorId": "m-1", "address": address}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    assert_eq!(app.state.monitors.len(), 1);
    let status = app.state.monitors.status("m-1").unwrap();
    assert_eq!(status.monitor.address, "addr-new");
}

// =============================================================================
// ERROR SHAPE TESTS
// =============================================================================

/// A blank address is rejected with the standard validation shape
#[tokio::test]
async fn test_start_monitor_rejects_empty_address() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_monitor_request(json!({"address": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], "rejected");
    assert_eq!(json["reason"], "validation_failed");

    assert!(app.state.monitors.is_empty());
}

/// Unknown monitor ids come back as the standard not-found shape
#[tokio::test]
async fn test_unknown_monitor_returns_not_found() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/v1/monitors/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["status"], "rejected");
    assert_eq!(json["reason"], "not_found");
}

/// Test malformed JSON request body
#[tokio::test]
async fn test_malformed_monitor_body_is_rejected() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/monitors")
                .header("Content-Type", "application/json")
                .body(Body::from("{ invalid json }"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

/// Test 404 for unknown routes
#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/v1/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test method not allowed
#[tokio::test]
async fn test_method_not_allowed() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/monitors")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// HEALTH AND METRICS TESTS
// =============================================================================

/// The detailed health endpoint reports every component
#[tokio::test]
async fn test_health_endpoint_reports_components() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"]["status"], "healthy");
    assert_eq!(json["dedup_store"]["status"], "healthy");
    assert_eq!(json["enhancement_pool"]["total_nodes"], 0);
    assert_eq!(json["active_monitors"], 0);
    assert!(json["uptime_seconds"].is_number());
}

/// Simple health endpoint for load balancers
#[tokio::test]
async fn test_simple_health_returns_ok() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// The metrics endpoint serves the Prometheus text format
#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("sentinel_monitors_active"));
    assert!(text.contains("sentinel_alerts_total"));
}

/// A plain GET on the WebSocket route is refused without an upgrade
#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
