//! Enhancement pool integration tests
//!
//! Runs the enhancement client against real node doubles on ephemeral
//! ports:
//! - Round-robin across healthy nodes
//! - Failed calls bench a node and degrade to the local fallback
//! - Health sweeps bench unreachable nodes and recover returning ones

use std::sync::Arc;

use dynamo_sentinel::config::EnhancementConfig;
use dynamo_sentinel::enhancement::{fallback_enhancement, EnhancementClient, NodeRegistry};
use dynamo_sentinel::metrics::MetricsState;

use crate::common::{analysis, enhancement, MockEnhancementNode};

fn pool_config(nodes: Vec<String>) -> EnhancementConfig {
    EnhancementConfig {
        nodes,
        enhance_timeout_ms: 1000,
        probe_timeout_ms: 500,
        health_check_interval_secs: 60,
    }
}

fn client_for(config: &EnhancementConfig) -> (EnhancementClient, Arc<NodeRegistry>) {
    let registry = Arc::new(NodeRegistry::new(config));
    (
        EnhancementClient::new(registry.clone(), config, None),
        registry,
    )
}

// =============================================================================
// LOAD BALANCING TESTS
// =============================================================================

/// Requests alternate between two healthy nodes
#[tokio::test]
async fn test_enhance_round_robins_across_nodes() {
    let node_a = MockEnhancementNode::spawn(enhancement(0.9, 70.0)).await;
    let node_b = MockEnhancementNode::spawn(enhancement(0.9, 70.0)).await;
    let config = pool_config(vec![node_a.url.clone(), node_b.url.clone()]);
    let (client, _registry) = client_for(&config);

    let input = analysis(50.0, vec![]);
    for _ in 0..4 {
        client.enhance(&input).await;
    }

    assert_eq!(node_a.enhance_requests(), 2);
    assert_eq!(node_b.enhance_requests(), 2);
}

/// A node's response is used as-is, without local rewriting
#[tokio::test]
async fn test_remote_enhancement_is_used_verbatim() {
    let node = MockEnhancementNode::spawn(enhancement(0.95, 88.0)).await;
    let config = pool_config(vec![node.url.clone()]);
    let (client, _registry) = client_for(&config);

    let enhanced = client.enhance(&analysis(60.0, vec![])).await;
    assert_eq!(enhanced.confidence, 0.95);
    assert_eq!(enhanced.score, 88.0);
    assert_eq!(enhanced.patterns, vec!["Flash Loan Attack"]);
}

// =============================================================================
// FAILURE AND FALLBACK TESTS
// =============================================================================

/// A failing node gets exactly one call before traffic shifts away
#[tokio::test]
async fn test_failed_node_is_benched_after_one_call() {
    let bad = MockEnhancementNode::spawn(enhancement(0.9, 70.0)).await;
    bad.set_enhance_ok(false);
    let good = MockEnhancementNode::spawn(enhancement(0.9, 70.0)).await;

    let config = pool_config(vec![bad.url.clone(), good.url.clone()]);
    let (client, registry) = client_for(&config);

    let input = analysis(50.0, vec![]);
    for _ in 0..4 {
        client.enhance(&input).await;
    }

    assert_eq!(bad.enhance_requests(), 1);
    assert_eq!(good.enhance_requests(), 3);
    assert_eq!(registry.healthy_count(), 1);
}

/// With every node benched the client stops calling out entirely and the
/// deterministic local fallback takes over
#[tokio::test]
async fn test_exhausted_pool_uses_local_fallback() {
    let node = MockEnhancementNode::spawn(enhancement(0.9, 70.0)).await;
    node.set_enhance_ok(false);

    let config = pool_config(vec![node.url.clone()]);
    let (client, registry) = client_for(&config);

    let input = analysis(45.0, vec![]);
    let first = client.enhance(&input).await;
    let second = client.enhance(&input).await;

    assert_eq!(registry.healthy_count(), 0);
    // Only the benching call reached the node
    assert_eq!(node.enhance_requests(), 1);
    assert_eq!(first, fallback_enhancement(&input));
    assert_eq!(second, first);
    assert_eq!(second.score, 45.0);
}

/// Every fallback is counted, whatever put the pool out of action
#[tokio::test]
async fn test_fallbacks_are_counted() {
    let config = pool_config(vec![]);
    let registry = Arc::new(NodeRegistry::new(&config));
    let metrics = Arc::new(MetricsState::new());
    let client = EnhancementClient::new(registry, &config, Some(metrics.clone()));

    client.enhance(&analysis(30.0, vec![])).await;
    client.enhance(&analysis(30.0, vec![])).await;

    assert_eq!(metrics.enhancement_fallbacks.get(), 2);
}

// =============================================================================
// HEALTH SWEEP TESTS
// =============================================================================

/// A sweep benches a node whose health endpoint answers non-2xx
#[tokio::test]
async fn test_health_sweep_benches_an_unreachable_node() {
    let node = MockEnhancementNode::spawn(enhancement(0.8, 65.0)).await;
    node.set_health_ok(false);

    let config = pool_config(vec![node.url.clone()]);
    let (_client, registry) = client_for(&config);
    // Optimistic until the first probe
    assert_eq!(registry.healthy_count(), 1);

    registry.run_health_checks().await;
    assert_eq!(registry.healthy_count(), 0);
    assert!(registry.nodes()[0].last_checked_at().is_some());
}

/// A sweep brings a recovered node back into rotation
#[tokio::test]
async fn test_health_sweep_recovers_a_node() {
    let node = MockEnhancementNode::spawn(enhancement(0.8, 65.0)).await;
    node.set_enhance_ok(false);

    let config = pool_config(vec![node.url.clone()]);
    let (client, registry) = client_for(&config);

    let input = analysis(40.0, vec![]);
    client.enhance(&input).await;
    assert_eq!(registry.healthy_count(), 0);

    node.set_enhance_ok(true);
    registry.run_health_checks().await;
    assert_eq!(registry.healthy_count(), 1);
    assert!(node.health_requests() >= 1);

    let enhanced = client.enhance(&input).await;
    assert_eq!(enhanced.score, 65.0);
    assert_eq!(node.enhance_requests(), 2);
}
