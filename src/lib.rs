//! Dynamo Sentinel Library
//!
//! Real-time exploit alerting for monitored blockchain addresses.
//! This library exposes core modules for testing.

pub mod analyzer;
pub mod broadcaster;
pub mod config;
pub mod constants;
pub mod db;
pub mod dedup;
pub mod dispatch;
pub mod enhancement;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod monitor;

// Re-export commonly used types for tests
pub use analyzer::AnalyzerClient;
pub use broadcaster::{Broadcaster, ClientId, OutboundMessage};
pub use config::AppConfig;
pub use db::DbPool;
pub use dedup::{DedupStore, RedisDedupStore};
pub use dispatch::AlertDispatcher;
pub use enhancement::{fallback_enhancement, EnhancementClient, NodeRegistry};
pub use error::{AppError, AppResult};
pub use metrics::MetricsState;
pub use models::{
    AnalysisResponse, Enhancement, Exploit, ExploitType, FullAnalysis, Monitor, MonitorConfig,
    MonitorStatus, SecurityAlert, Severity,
};
pub use monitor::{poll_once, MonitorRegistry, PollerContext, TickSummary};
