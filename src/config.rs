//! Configuration management for Dynamo Sentinel
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Transaction Analyzer endpoint configuration
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Enhancement node pool configuration
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    /// Dedup store (Redis) configuration
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Monitor scheduling and risk thresholds
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Alert delivery configuration
    #[serde(default)]
    pub alerts: AlertConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Transaction Analyzer endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Base URL of the analyzer service
    #[serde(default = "default_analyzer_url")]
    pub base_url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_analyzer_timeout")]
    pub timeout_ms: u64,
}

fn default_analyzer_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_analyzer_timeout() -> u64 {
    15000
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: default_analyzer_url(),
            timeout_ms: default_analyzer_timeout(),
        }
    }
}

/// Enhancement node pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnhancementConfig {
    /// Node endpoint URLs; an empty list means permanent local fallback
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Enhance request timeout in milliseconds
    #[serde(default = "default_enhance_timeout")]
    pub enhance_timeout_ms: u64,
    /// Health probe timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// Seconds between health check sweeps
    #[serde(default = "default_health_interval")]
    pub health_check_interval_secs: u64,
}

fn default_enhance_timeout() -> u64 {
    12000
}

fn default_probe_timeout() -> u64 {
    5000
}

fn default_health_interval() -> u64 {
    60
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            enhance_timeout_ms: default_enhance_timeout(),
            probe_timeout_ms: default_probe_timeout(),
            health_check_interval_secs: default_health_interval(),
        }
    }
}

/// Dedup store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Seconds a processed signature stays suppressed
    #[serde(default = "default_dedup_ttl")]
    pub ttl_secs: u64,
    /// Key namespace prefix
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_dedup_ttl() -> u64 {
    86400 // 24 hours
}

fn default_key_prefix() -> String {
    "sentinel:processed".to_string()
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            ttl_secs: default_dedup_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Monitor scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Seconds between polls of each monitored address
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Combined risk score above which an alert is dispatched (0-100, strict)
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,
    /// Recent activity items fetched per poll
    #[serde(default = "default_activity_limit")]
    pub activity_limit: usize,
    /// Network assumed when a monitor request omits one
    #[serde(default = "default_network")]
    pub default_network: String,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_risk_threshold() -> f64 {
    60.0
}

fn default_activity_limit() -> usize {
    5
}

fn default_network() -> String {
    "mainnet-beta".to_string()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            risk_threshold: default_risk_threshold(),
            activity_limit: default_activity_limit(),
            default_network: default_network(),
        }
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Webhook POST timeout in milliseconds (single attempt)
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_ms: u64,
}

fn default_webhook_timeout() -> u64 {
    5000
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_timeout_ms: default_webhook_timeout(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/sentinel.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SENTINEL_*)
    /// 2. config/config.yaml (if exists)
    /// 3. config.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8090)?
            .set_default("analyzer.base_url", "http://127.0.0.1:8080")?
            .set_default("analyzer.timeout_ms", 15000)?
            .set_default("enhancement.enhance_timeout_ms", 12000)?
            .set_default("enhancement.probe_timeout_ms", 5000)?
            .set_default("enhancement.health_check_interval_secs", 60)?
            .set_default("dedup.redis_url", "redis://127.0.0.1:6379")?
            .set_default("dedup.ttl_secs", 86400)?
            .set_default("dedup.key_prefix", "sentinel:processed")?
            .set_default("monitoring.poll_interval_secs", 10)?
            .set_default("monitoring.risk_threshold", 60.0)?
            .set_default("monitoring.activity_limit", 5)?
            .set_default("monitoring.default_network", "mainnet-beta")?
            .set_default("alerts.webhook_timeout_ms", 5000)?
            .set_default("database.path", "data/sentinel.db")?
            .set_default("database.max_connections", 5)?
            // Load from config files (lower priority)
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/config").required(false))
            // Override with environment variables (highest priority - loaded last)
            // SENTINEL_SERVER__PORT=9090 -> server.port = 9090
            // SENTINEL_ENHANCEMENT__NODES=http://a:9000,http://b:9000 -> enhancement.nodes
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analyzer.base_url.is_empty() {
            return Err(ConfigError::Message(
                "Analyzer base URL must be set".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.monitoring.risk_threshold) {
            return Err(ConfigError::Message(
                "Risk threshold must be within 0-100".to_string(),
            ));
        }

        if self.monitoring.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Poll interval must be at least 1 second".to_string(),
            ));
        }

        if self.monitoring.activity_limit == 0 {
            return Err(ConfigError::Message(
                "Activity limit must be at least 1".to_string(),
            ));
        }

        if self.dedup.ttl_secs == 0 {
            return Err(ConfigError::Message(
                "Dedup TTL must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}
