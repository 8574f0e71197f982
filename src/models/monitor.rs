//! Monitor models - one record per watched address

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Active,
    Inactive,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Active => write!(f, "active"),
            MonitorState::Inactive => write!(f, "inactive"),
        }
    }
}

/// Request to start (or replace) a monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Caller-supplied identity; generated when absent
    #[serde(default)]
    pub monitor_id: Option<String>,
    /// Address to watch
    pub address: String,
    /// Network the address lives on; configured default when absent
    #[serde(default)]
    pub network: Option<String>,
    /// Optional webhook for alert delivery
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// A registered monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub monitor_id: String,
    pub address: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub status: MonitorState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Monitor {
    /// Build a monitor from a start request, filling the id and network
    pub fn from_config(config: MonitorConfig, default_network: &str) -> Self {
        let monitor_id = config
            .monitor_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let network = config
            .network
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_network.to_string());

        Self {
            monitor_id,
            address: config.address,
            network,
            webhook_url: config.webhook_url,
            status: MonitorState::Active,
            started_at: Utc::now(),
            last_checked_at: None,
        }
    }
}

/// Monitor snapshot plus scheduling state, as returned by the status API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    #[serde(flatten)]
    pub monitor: Monitor,
    /// Whether a recurring poll job is currently registered
    pub scheduled: bool,
}
