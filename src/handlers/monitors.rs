//! Monitor management endpoints
//!
//! REST surface over the monitor registry: start, inspect and stop the
//! recurring poll jobs. All request/response bodies are camelCase JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Monitor, MonitorConfig, MonitorStatus};

use super::health::AppState;

/// Start (or replace) a monitor
///
/// POST /api/v1/monitors
pub async fn start_monitor(
    State(state): State<Arc<AppState>>,
    Json(config): Json<MonitorConfig>,
) -> AppResult<(StatusCode, Json<Monitor>)> {
    if config.address.trim().is_empty() {
        return Err(AppError::Validation("address must not be empty".to_string()));
    }

    let monitor = state.monitors.start(config);
    Ok((StatusCode::CREATED, Json(monitor)))
}

/// List all monitors
///
/// GET /api/v1/monitors
pub async fn list_monitors(State(state): State<Arc<AppState>>) -> Json<Vec<MonitorStatus>> {
    Json(state.monitors.list())
}

/// Get one monitor's status
///
/// GET /api/v1/monitors/:monitor_id
pub async fn get_monitor(
    State(state): State<Arc<AppState>>,
    Path(monitor_id): Path<String>,
) -> AppResult<Json<MonitorStatus>> {
    Ok(Json(state.monitors.status(&monitor_id)?))
}

/// Stop a monitor
///
/// DELETE /api/v1/monitors/:monitor_id
pub async fn stop_monitor(
    State(state): State<Arc<AppState>>,
    Path(monitor_id): Path<String>,
) -> AppResult<Json<Monitor>> {
    Ok(Json(state.monitors.stop(&monitor_id)?))
}
