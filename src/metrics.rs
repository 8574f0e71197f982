//! Prometheus metrics for Dynamo Sentinel
//!
//! Exposes metrics endpoint for monitoring:
//! - Active monitor / connected client / healthy node gauges
//! - Analysis and alert counters
//! - Enhancement fallback and webhook failure counters

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics state
pub struct MetricsState {
    /// Prometheus registry
    registry: Registry,
    /// Active monitors gauge
    pub monitors_active: IntGauge,
    /// Connected broadcast clients gauge
    pub ws_clients: IntGauge,
    /// Healthy enhancement nodes gauge
    pub nodes_healthy: IntGauge,
    /// Total transactions analyzed (counter)
    pub analyses_total: IntCounter,
    /// Total alerts dispatched (counter)
    pub alerts_total: IntCounter,
    /// Total local enhancement fallbacks (counter)
    pub enhancement_fallbacks: IntCounter,
    /// Total failed webhook deliveries (counter)
    pub webhook_failures: IntCounter,
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered
    pub fn new() -> Self {
        let registry = Registry::new();

        // Active monitors gauge
        let monitors_active = IntGauge::with_opts(Opts::new(
            "sentinel_monitors_active",
            "Number of registered recurring monitors",
        ))
        .expect("Failed to create monitors_active gauge");
        registry
            .register(Box::new(monitors_active.clone()))
            .expect("Failed to register monitors_active");

        // Connected clients gauge
        let ws_clients = IntGauge::with_opts(Opts::new(
            "sentinel_ws_clients",
            "Number of connected broadcast clients",
        ))
        .expect("Failed to create ws_clients gauge");
        registry
            .register(Box::new(ws_clients.clone()))
            .expect("Failed to register ws_clients");

        // Healthy nodes gauge
        let nodes_healthy = IntGauge::with_opts(Opts::new(
            "sentinel_nodes_healthy",
            "Number of enhancement nodes currently marked healthy",
        ))
        .expect("Failed to create nodes_healthy gauge");
        registry
            .register(Box::new(nodes_healthy.clone()))
            .expect("Failed to register nodes_healthy");

        // Analyses counter
        let analyses_total = IntCounter::with_opts(Opts::new(
            "sentinel_analyses_total",
            "Total transactions analyzed across all monitors",
        ))
        .expect("Failed to create analyses_total counter");
        registry
            .register(Box::new(analyses_total.clone()))
            .expect("Failed to register analyses_total");

        // Alerts counter
        let alerts_total = IntCounter::with_opts(Opts::new(
            "sentinel_alerts_total",
            "Total security alerts dispatched",
        ))
        .expect("Failed to create alerts_total counter");
        registry
            .register(Box::new(alerts_total.clone()))
            .expect("Failed to register alerts_total");

        // Enhancement fallback counter
        let enhancement_fallbacks = IntCounter::with_opts(Opts::new(
            "sentinel_enhancement_fallbacks_total",
            "Total analyses enhanced by the local fallback instead of a node",
        ))
        .expect("Failed to create enhancement_fallbacks counter");
        registry
            .register(Box::new(enhancement_fallbacks.clone()))
            .expect("Failed to register enhancement_fallbacks");

        // Webhook failure counter
        let webhook_failures = IntCounter::with_opts(Opts::new(
            "sentinel_webhook_failures_total",
            "Total webhook deliveries that failed or timed out",
        ))
        .expect("Failed to create webhook_failures counter");
        registry
            .register(Box::new(webhook_failures.clone()))
            .expect("Failed to register webhook_failures");

        Self {
            registry,
            monitors_active,
            ws_clients,
            nodes_healthy,
            analyses_total,
            alerts_total,
            enhancement_fallbacks,
            webhook_failures,
        }
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics handler - returns Prometheus metrics in text format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry().gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        buffer,
    )
}

/// Create metrics router
pub fn metrics_router() -> Router<Arc<MetricsState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
