//! Redis dedup store tests
//!
//! These need a live Redis and are ignored by default. Run them with:
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored
//! ```
//!
//! Each run writes under a fresh random key prefix, so concurrent runs and
//! leftover keys from aborted runs cannot interfere.

use std::time::Duration;

use dynamo_sentinel::config::DedupConfig;
use dynamo_sentinel::dedup::{DedupStore, RedisDedupStore};

fn test_config() -> DedupConfig {
    DedupConfig {
        redis_url: std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        ttl_secs: 60,
        key_prefix: format!("sentinel-test:{}", uuid::Uuid::new_v4()),
    }
}

/// An unseen signature turns present after marking
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_mark_then_has() {
    let store = RedisDedupStore::connect(&test_config()).await.unwrap();

    assert!(!store.has("sig-1").await.unwrap());
    store
        .mark_processed("sig-1", Duration::from_secs(60))
        .await
        .unwrap();
    assert!(store.has("sig-1").await.unwrap());
}

/// Keys disappear on their own once the TTL lapses
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_ttl_expires() {
    let store = RedisDedupStore::connect(&test_config()).await.unwrap();

    store
        .mark_processed("sig-ttl", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(store.has("sig-ttl").await.unwrap());

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(!store.has("sig-ttl").await.unwrap());
}

/// PING round-trips through the connection manager
#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_ping() {
    let store = RedisDedupStore::connect(&test_config()).await.unwrap();
    store.ping().await.unwrap();
}
