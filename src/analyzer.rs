//! Transaction Analyzer client
//!
//! Thin HTTP client for the analyzer service: single-transaction analysis
//! and the recent-activity feed. Every call carries the configured timeout;
//! failures surface as `AppError::Upstream` for the caller to handle per item.

use std::time::Duration;

use crate::config::AnalyzerConfig;
use crate::constants::analyzer::{ACTIVITY_PATH, ANALYZE_PATH};
use crate::error::{AppError, AppResult};
use crate::models::{ActivityItem, AnalysisRequest, AnalysisResponse};

/// Client for the Transaction Analyzer service
#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalyzerClient {
    /// Create a new analyzer client
    pub fn new(config: &AnalyzerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Analyze a single transaction signature
    pub async fn analyze(&self, signature: &str, network: &str) -> AppResult<AnalysisResponse> {
        let url = format!("{}{}", self.base_url, ANALYZE_PATH);
        let request = AnalysisRequest {
            signature: signature.to_string(),
            network: Some(network.to_string()),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("analyzer request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "analyzer returned {} for {}",
                response.status(),
                signature
            )));
        }

        response
            .json::<AnalysisResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("analyzer response malformed: {}", e)))
    }

    /// Fetch the most recent activity items for an address, newest first
    pub async fn recent_activity(
        &self,
        address: &str,
        network: &str,
        limit: usize,
    ) -> AppResult<Vec<ActivityItem>> {
        let url = format!("{}{}/{}", self.base_url, ACTIVITY_PATH, address);

        let response = self
            .client
            .get(&url)
            .query(&[("network", network), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("activity fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "activity fetch returned {} for {}",
                response.status(),
                address
            )));
        }

        response
            .json::<Vec<ActivityItem>>()
            .await
            .map_err(|e| AppError::Upstream(format!("activity response malformed: {}", e)))
    }
}
