//! Dynamo Sentinel - real-time exploit alerting service
//!
//! This is the main entry point for the Sentinel service.
//! It wires the poll pipeline together and sets up the Axum web server.

mod analyzer;
mod broadcaster;
mod config;
mod constants;
mod db;
mod dedup;
mod dispatch;
mod enhancement;
mod error;
mod handlers;
mod metrics;
mod models;
mod monitor;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::analyzer::AnalyzerClient;
use crate::broadcaster::Broadcaster;
use crate::config::AppConfig;
use crate::dedup::{DedupStore, RedisDedupStore};
use crate::dispatch::AlertDispatcher;
use crate::enhancement::{run_health_check_task, EnhancementClient, NodeRegistry};
use crate::handlers::{
    get_monitor, health_check, health_simple, list_monitors, start_monitor, stop_monitor,
    ws_handler, AppState,
};
use crate::metrics::{metrics_router, MetricsState};
use crate::monitor::{MonitorRegistry, PollerContext};

/// Seconds between gauge refreshes
const GAUGE_SAMPLE_INTERVAL_SECS: u64 = 15;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    tracing::info!("Starting Dynamo Sentinel v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        analyzer = %config.analyzer.base_url,
        "Configuration loaded"
    );

    // Initialize database
    let db_pool = db::init_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;
    tracing::info!("Database initialized");

    // Connect the dedup store; without it every replica would re-alert on
    // the same transactions, so a failed connection is fatal at boot
    let dedup: Arc<dyn DedupStore> = Arc::new(RedisDedupStore::connect(&config.dedup).await?);
    tracing::info!("Dedup store connected");

    let metrics = Arc::new(MetricsState::new());

    let shutdown_token = CancellationToken::new();

    // Enhancement node pool and its health sweep
    let node_registry = Arc::new(NodeRegistry::new(&config.enhancement));
    if node_registry.node_count() > 0 {
        tokio::spawn(run_health_check_task(
            node_registry.clone(),
            Duration::from_secs(config.enhancement.health_check_interval_secs),
            shutdown_token.child_token(),
        ));
        tracing::info!(
            nodes = node_registry.node_count(),
            "Enhancement health check task started"
        );
    } else {
        tracing::info!("No enhancement nodes configured, using local fallback only");
    }

    let broadcaster = Arc::new(Broadcaster::new());
    let dispatcher = AlertDispatcher::new(&config.alerts, broadcaster.clone(), Some(metrics.clone()));
    let analyzer = AnalyzerClient::new(&config.analyzer);
    let enhancement = EnhancementClient::new(
        node_registry.clone(),
        &config.enhancement,
        Some(metrics.clone()),
    );

    let poller_ctx = Arc::new(PollerContext {
        dedup: dedup.clone(),
        analyzer,
        enhancement,
        dispatcher,
        history: db_pool.clone(),
        activity_limit: config.monitoring.activity_limit,
        risk_threshold: config.monitoring.risk_threshold,
        dedup_ttl: Duration::from_secs(config.dedup.ttl_secs),
        metrics: Some(metrics.clone()),
    });

    let monitors = Arc::new(MonitorRegistry::new(
        poller_ctx,
        Duration::from_secs(config.monitoring.poll_interval_secs),
        config.monitoring.default_network.clone(),
    ));
    tracing::info!(
        poll_interval_secs = config.monitoring.poll_interval_secs,
        risk_threshold = config.monitoring.risk_threshold,
        "Monitor registry initialized"
    );

    // Gauge sampler: cheap reads, so a coarse interval is enough
    {
        let metrics = metrics.clone();
        let monitors = monitors.clone();
        let broadcaster = broadcaster.clone();
        let node_registry = node_registry.clone();
        let cancel = shutdown_token.child_token();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(GAUGE_SAMPLE_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        metrics.monitors_active.set(monitors.len() as i64);
                        metrics.ws_clients.set(broadcaster.client_count() as i64);
                        metrics.nodes_healthy.set(node_registry.healthy_count() as i64);
                    }
                }
            }
        });
    }

    // Create shared state
    let app_state = Arc::new(AppState {
        db: db_pool.clone(),
        dedup,
        broadcaster: broadcaster.clone(),
        monitors: monitors.clone(),
        nodes: node_registry.clone(),
        started_at: Utc::now(),
    });

    // Monitor management + detailed health under /api/v1
    let api_routes = Router::new()
        .route("/monitors", post(start_monitor).get(list_monitors))
        .route("/monitors/:monitor_id", get(get_monitor).delete(stop_monitor))
        .route("/health", get(health_check))
        .with_state(app_state.clone());

    // Simple health check for load balancers, plus the WebSocket endpoint
    let root_routes = Router::new()
        .route("/health", get(health_simple))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    // Build final router
    let app = Router::new()
        .nest("/api/v1", api_routes)
        .merge(root_routes)
        .merge(metrics_router().with_state(metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("Invalid server address");

    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token, monitors))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for a termination signal, then stop the background tasks
async fn shutdown_signal(shutdown: CancellationToken, monitors: Arc<MonitorRegistry>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping background tasks");
    monitors.shutdown();
    shutdown.cancel();
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynamo_sentinel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}
