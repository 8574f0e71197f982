//! Database integration tests
//!
//! Verifies the SQLite pool configuration and the analysis-history store
//! against a real on-disk database.

use dynamo_sentinel::db::{history_count, record_analysis};

use crate::common::test_db;

// =============================================================================
// POOL CONFIGURATION TESTS
// =============================================================================

/// WAL journaling is active on file-backed pools
#[tokio::test]
async fn test_wal_mode_enabled() {
    let (pool, _tmp) = test_db().await;

    let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

/// Writers wait out lock contention instead of failing fast
#[tokio::test]
async fn test_busy_timeout_configured() {
    let (pool, _tmp) = test_db().await;

    let (timeout_ms,): (i64,) = sqlx::query_as("PRAGMA busy_timeout")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(timeout_ms >= 5000);
}

// =============================================================================
// HISTORY STORE TESTS
// =============================================================================

/// Row ids come back in insert order
#[tokio::test]
async fn test_record_analysis_returns_rowid() {
    let (pool, _tmp) = test_db().await;

    let first = record_analysis(&pool, "sig-1", "addr-1", "mainnet-beta", 40.0, false, "{}")
        .await
        .unwrap();
    let second = record_analysis(&pool, "sig-2", "addr-1", "mainnet-beta", 90.0, true, "{}")
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

/// The alerted flag survives a write/read cycle
#[tokio::test]
async fn test_alerted_flag_roundtrip() {
    let (pool, _tmp) = test_db().await;

    record_analysis(&pool, "sig-hot", "addr-1", "mainnet-beta", 88.0, true, "{}")
        .await
        .unwrap();
    record_analysis(&pool, "sig-cold", "addr-1", "mainnet-beta", 12.0, false, "{}")
        .await
        .unwrap();

    for (signature, expected) in [("sig-hot", 1i64), ("sig-cold", 0i64)] {
        let (alerted,): (i64,) =
            sqlx::query_as("SELECT alerted FROM analysis_history WHERE signature = ?")
                .bind(signature)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(alerted, expected, "alerted flag for {}", signature);
    }
}

/// Concurrent history writes all land under WAL
#[tokio::test]
async fn test_concurrent_history_writes() {
    let (pool, _tmp) = test_db().await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            record_analysis(
                &pool,
                &format!("sig-{}", i),
                "addr-1",
                "mainnet-beta",
                50.0,
                false,
                "{}",
            )
            .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(history_count(&pool).await.unwrap(), 10);
}
