//! Processed-transaction dedup store
//!
//! Membership lives in Redis only: keys expire server-side after the
//! configured TTL and no local cache shadows them, so every monitor replica
//! shares one view of what has already been processed. The trait seam exists
//! so the poll pipeline can run against an in-memory double in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::config::DedupConfig;
use crate::error::AppResult;

/// TTL-bounded set of already-processed transaction signatures
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether this signature was processed within the TTL window
    async fn has(&self, signature: &str) -> AppResult<bool>;

    /// Record a signature; it stays suppressed until the TTL lapses
    async fn mark_processed(&self, signature: &str, ttl: Duration) -> AppResult<()>;

    /// Backend liveness, surfaced by the health endpoint
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Redis-backed dedup store.
/// Uses a `ConnectionManager` for automatic reconnection and resilience.
#[derive(Clone)]
pub struct RedisDedupStore {
    conn_manager: ConnectionManager,
    key_prefix: String,
    redis_url: String,
}

impl fmt::Debug for RedisDedupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisDedupStore")
            .field("redis_url", &self.redis_url)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisDedupStore {
    /// Connect to Redis; fails fast when the initial connection cannot be made
    pub async fn connect(config: &DedupConfig) -> AppResult<Self> {
        tracing::info!(url = %config.redis_url, "Initializing dedup store connection manager");
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn_manager = ConnectionManager::new(client).await?;

        Ok(Self {
            conn_manager,
            key_prefix: config.key_prefix.clone(),
            redis_url: config.redis_url.clone(),
        })
    }

    fn key(&self, signature: &str) -> String {
        format!("{}:{}", self.key_prefix, signature)
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn has(&self, signature: &str) -> AppResult<bool> {
        let mut conn = self.conn_manager.clone();
        let exists: bool = conn.exists(self.key(signature)).await?;
        Ok(exists)
    }

    async fn mark_processed(&self, signature: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        conn.set_ex::<_, _, ()>(self.key(signature), 1u8, ttl.as_secs())
            .await?;
        tracing::trace!(signature = %signature, ttl_secs = ttl.as_secs(), "Marked signature processed");
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
