//! Alert models - the payload delivered to webhooks and broadcast clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::{Exploit, FullAnalysis};
use super::monitor::Monitor;

/// A high-risk finding ready for delivery.
///
/// Immutable once constructed; webhook delivery and broadcast both serialize
/// the same value. Top-level keys are camelCase (the dashboard contract),
/// embedded exploits keep the analyzer's snake_case wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub monitor_id: String,
    pub address: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub exploits: Vec<Exploit>,
    pub message: String,
}

impl SecurityAlert {
    /// Build the alert for a completed analysis that crossed the threshold
    pub fn from_analysis(monitor: &Monitor, analysis: &FullAnalysis) -> Self {
        let message = match analysis.top_severity() {
            Some(severity) => format!(
                "High-risk transaction {} on {}: {} finding(s), top severity {}, risk score {:.1}",
                analysis.signature,
                analysis.network,
                analysis.exploits.len(),
                severity,
                analysis.risk_score
            ),
            None => format!(
                "High-risk transaction {} on {}: risk score {:.1}",
                analysis.signature, analysis.network, analysis.risk_score
            ),
        };

        Self {
            monitor_id: monitor.monitor_id.clone(),
            address: monitor.address.clone(),
            timestamp: Utc::now(),
            risk_score: analysis.risk_score,
            exploits: analysis.exploits.clone(),
            message,
        }
    }
}
