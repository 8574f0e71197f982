//! Alert dispatch - webhook delivery and broadcast fan-out
//!
//! Every alert goes to two independent sinks: a single best-effort webhook
//! POST (when the monitor has one configured) and a broadcast on the fixed
//! security-alert channel. Neither sink waits for or knows about the other,
//! and neither can fail the poll tick that produced the alert.

use std::sync::Arc;
use std::time::Duration;

use crate::broadcaster::Broadcaster;
use crate::config::AlertConfig;
use crate::constants::channels::SECURITY_ALERT;
use crate::error::{AppError, AppResult};
use crate::metrics::MetricsState;
use crate::models::SecurityAlert;

/// Fans alerts out to webhooks and broadcast subscribers
pub struct AlertDispatcher {
    client: reqwest::Client,
    broadcaster: Arc<Broadcaster>,
    metrics: Option<Arc<MetricsState>>,
}

impl AlertDispatcher {
    /// Create a new dispatcher; the webhook timeout is fixed at construction
    pub fn new(
        config: &AlertConfig,
        broadcaster: Arc<Broadcaster>,
        metrics: Option<Arc<MetricsState>>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.webhook_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            broadcaster,
            metrics,
        }
    }

    /// Deliver an alert to both sinks.
    ///
    /// The webhook attempt runs as a detached task: one POST, no retries,
    /// failure logged. The broadcast happens regardless of the webhook
    /// outcome.
    pub fn dispatch(&self, alert: &SecurityAlert, webhook_url: Option<&str>) {
        if let Some(metrics) = &self.metrics {
            metrics.alerts_total.inc();
        }

        if let Some(url) = webhook_url {
            let client = self.client.clone();
            let url = url.to_string();
            let payload = alert.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                if let Err(e) = post_webhook(&client, &url, &payload).await {
                    tracing::warn!(
                        url = %url,
                        monitor_id = %payload.monitor_id,
                        error = %e,
                        "Webhook delivery failed"
                    );
                    if let Some(metrics) = metrics {
                        metrics.webhook_failures.inc();
                    }
                }
            });
        }

        let payload = match serde_json::to_value(alert) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize alert for broadcast");
                return;
            }
        };

        let delivered = self.broadcaster.broadcast(SECURITY_ALERT, payload);
        tracing::info!(
            monitor_id = %alert.monitor_id,
            address = %alert.address,
            risk_score = alert.risk_score,
            delivered,
            "Security alert dispatched"
        );
    }
}

/// Single webhook delivery attempt
async fn post_webhook(
    client: &reqwest::Client,
    url: &str,
    alert: &SecurityAlert,
) -> AppResult<()> {
    let response = client
        .post(url)
        .json(alert)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("webhook request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "webhook target returned {}",
            response.status()
        )));
    }

    Ok(())
}
