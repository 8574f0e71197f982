//! Enhancement node registry
//!
//! Holds the fixed node pool and its health state. Selection and health
//! updates touch only atomics, so the enhance path never waits on the
//! health-check sweep.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::EnhancementConfig;
use crate::constants::enhancement::HEALTH_PATH;

/// A single enhancement node. Records are created at startup and never
/// destroyed; only `healthy` and `last_checked_at` change afterwards.
pub struct EnhancementNode {
    /// Stable identity, `node-<index>` in configuration order
    pub id: String,
    /// Base URL of the node
    pub endpoint: String,
    healthy: AtomicBool,
    last_checked_at: RwLock<Option<DateTime<Utc>>>,
}

impl EnhancementNode {
    fn new(index: usize, endpoint: &str) -> Self {
        Self {
            id: format!("node-{}", index),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            // Optimistic until the first probe or failed call says otherwise
            healthy: AtomicBool::new(true),
            last_checked_at: RwLock::new(None),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        *self.last_checked_at.read()
    }

    fn touch(&self) {
        *self.last_checked_at.write() = Some(Utc::now());
    }
}

/// Fixed pool of enhancement nodes with round-robin selection
pub struct NodeRegistry {
    nodes: Vec<Arc<EnhancementNode>>,
    cursor: AtomicUsize,
    probe_client: reqwest::Client,
}

impl NodeRegistry {
    /// Build the pool from configuration. An empty node list is valid and
    /// leaves the service in permanent local-fallback mode.
    pub fn new(config: &EnhancementConfig) -> Self {
        let nodes = config
            .nodes
            .iter()
            .enumerate()
            .map(|(index, endpoint)| Arc::new(EnhancementNode::new(index, endpoint)))
            .collect::<Vec<_>>();

        let probe_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.probe_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            nodes,
            cursor: AtomicUsize::new(0),
            probe_client,
        }
    }

    /// Pick the next healthy node, round robin over the healthy subset.
    /// Returns `None` when every node is unhealthy (or none are configured).
    pub fn select_healthy(&self) -> Option<Arc<EnhancementNode>> {
        let healthy: Vec<_> = self
            .nodes
            .iter()
            .filter(|node| node.is_healthy())
            .cloned()
            .collect();

        if healthy.is_empty() {
            return None;
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % healthy.len();
        Some(healthy[index].clone())
    }

    /// Mark a node unhealthy after a failed call. The next probe sweep may
    /// bring it back.
    pub fn mark_unhealthy(&self, node_id: &str) {
        if let Some(node) = self.nodes.iter().find(|n| n.id == node_id) {
            if node.is_healthy() {
                tracing::warn!(node = %node_id, endpoint = %node.endpoint, "Marking enhancement node unhealthy");
            }
            node.set_healthy(false);
        }
    }

    /// Probe every node concurrently and update health flags independently
    pub async fn run_health_checks(&self) {
        let checks = self.nodes.iter().map(|node| {
            let node = node.clone();
            let client = self.probe_client.clone();
            async move {
                let was_healthy = node.is_healthy();
                let healthy = probe_node(&client, &node.endpoint).await;
                node.set_healthy(healthy);
                node.touch();

                if healthy != was_healthy {
                    tracing::info!(
                        node = %node.id,
                        endpoint = %node.endpoint,
                        healthy,
                        "Enhancement node health changed"
                    );
                } else {
                    tracing::trace!(node = %node.id, healthy, "Enhancement node probed");
                }
            }
        });

        futures_util::future::join_all(checks).await;
    }

    /// Number of nodes currently marked healthy
    pub fn healthy_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_healthy()).count()
    }

    /// Total configured nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, for the health endpoint
    pub fn nodes(&self) -> &[Arc<EnhancementNode>] {
        &self.nodes
    }
}

/// Probe a node's health endpoint; any 2xx counts as healthy
async fn probe_node(client: &reqwest::Client, endpoint: &str) -> bool {
    let url = format!("{}{}", endpoint, HEALTH_PATH);
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!(endpoint = %endpoint, error = %e, "Health probe failed");
            false
        }
    }
}

/// Start the periodic health-check sweep
pub async fn run_health_check_task(
    registry: Arc<NodeRegistry>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    tracing::info!(
        nodes = registry.node_count(),
        interval_secs = interval.as_secs(),
        "Starting enhancement health-check task"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("Enhancement health-check task shutting down");
                break;
            }
            _ = ticker.tick() => {
                registry.run_health_checks().await;
                tracing::debug!(
                    healthy = registry.healthy_count(),
                    total = registry.node_count(),
                    "Enhancement health sweep complete"
                );
            }
        }
    }
}
