//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::broadcaster::Broadcaster;
use crate::db::DbPool;
use crate::dedup::DedupStore;
use crate::enhancement::NodeRegistry;
use crate::monitor::MonitorRegistry;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Uptime in seconds
    pub uptime_seconds: i64,
    /// Monitors with a scheduled poll job
    pub active_monitors: usize,
    /// Connected broadcast clients
    pub connected_clients: usize,
    /// Database status
    pub database: ComponentHealth,
    /// Dedup store status
    pub dedup_store: ComponentHealth,
    /// Enhancement node pool status
    pub enhancement_pool: EnhancementPoolHealth,
}

/// Health status enum
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but operational
    Degraded,
    /// Critical systems failing
    Unhealthy,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Enhancement pool health info
#[derive(Debug, Serialize)]
pub struct EnhancementPoolHealth {
    pub healthy_nodes: usize,
    pub total_nodes: usize,
}

/// Shared application state for the HTTP surface
pub struct AppState {
    /// Database connection pool
    pub db: DbPool,
    /// Dedup store (pinged for liveness)
    pub dedup: Arc<dyn DedupStore>,
    /// Subscription hub behind the WebSocket endpoint
    pub broadcaster: Arc<Broadcaster>,
    /// Monitor scheduler
    pub monitors: Arc<MonitorRegistry>,
    /// Enhancement node pool
    pub nodes: Arc<NodeRegistry>,
    /// Application start time
    pub started_at: chrono::DateTime<Utc>,
}

/// Health check handler
///
/// GET /api/v1/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let now = Utc::now();
    let uptime = (now - state.started_at).num_seconds();

    let db_health = check_database(&state.db).await;
    let dedup_health = check_dedup(state.dedup.as_ref()).await;

    let healthy_nodes = state.nodes.healthy_count();
    let total_nodes = state.nodes.node_count();

    let overall_status = overall_status(
        db_health.status,
        dedup_health.status,
        healthy_nodes,
        total_nodes,
    );

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still return 200 for degraded
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status: overall_status,
        uptime_seconds: uptime,
        active_monitors: state.monitors.len(),
        connected_clients: state.broadcaster.client_count(),
        database: db_health,
        dedup_store: dedup_health,
        enhancement_pool: EnhancementPoolHealth {
            healthy_nodes,
            total_nodes,
        },
    };

    (status_code, Json(response))
}

/// Simple health check (for load balancers)
///
/// GET /health
pub async fn health_simple() -> StatusCode {
    StatusCode::OK
}

/// Roll component states up into one verdict.
///
/// A database outage is fatal. A dedup outage or a fully unhealthy node pool
/// degrades the service but the pipeline keeps alerting, so both map to
/// degraded rather than unhealthy.
fn overall_status(
    db: HealthStatus,
    dedup: HealthStatus,
    healthy_nodes: usize,
    total_nodes: usize,
) -> HealthStatus {
    if db == HealthStatus::Unhealthy {
        HealthStatus::Unhealthy
    } else if dedup == HealthStatus::Unhealthy || (total_nodes > 0 && healthy_nodes == 0) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Check database health
async fn check_database(pool: &DbPool) -> ComponentHealth {
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            }
        }
    }
}

/// Check dedup store health
async fn check_dedup(store: &dyn DedupStore) -> ComponentHealth {
    match store.ping().await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "Dedup store health check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            }
        }
    }
}
