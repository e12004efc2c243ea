//! Redis-backed best-effort cache store.
//!
//! A shared network cache. Writes are plain `SET`s with no transaction, so a
//! write may be lost or overwritten by a concurrent resolution. The resolver
//! treats every failure here as a miss (reads) or a logged warning (writes).

use async_trait::async_trait;
use aside_core::{CacheKey, StoreError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::traits::{CacheStore, StatsRecorder, StoreKind, StoreStats};

/// Keys longer than this are stored under their digest form.
pub const REDIS_MAX_KEY_SIZE: usize = 1024;

/// Best-effort cache store over a multiplexed Redis connection.
pub struct RedisStore {
    conn: ConnectionManager,
    stats: StatsRecorder,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// The connection manager reconnects on its own after transient
    /// failures; this call fails only if the first connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError::unavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        tracing::info!(url = %redact_url(url), "Redis cache store connected");

        Ok(Self {
            conn,
            stats: StatsRecorder::default(),
        })
    }

    fn encode(key: &CacheKey) -> Vec<u8> {
        key.encode(REDIS_MAX_KEY_SIZE)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn kind(&self) -> StoreKind {
        StoreKind::BestEffort
    }

    async fn get(&self, key: &CacheKey) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(Self::encode(key)).await.map_err(|e| {
            self.stats.miss();
            StoreError::unavailable(e.to_string())
        })?;

        match value {
            Some(bytes) => {
                self.stats.hit();
                Ok(bytes)
            }
            None => {
                self.stats.miss();
                Err(StoreError::NotFound)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match conn.set::<_, _, ()>(Self::encode(key), value).await {
            Ok(()) => {
                self.stats.write();
                Ok(())
            }
            Err(e) => {
                self.stats.write_failure();
                Err(StoreError::commit_failed(e.to_string()))
            }
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(Self::encode(key))
            .await
            .map_err(|e| StoreError::commit_failed(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let mut conn = self.conn.clone();
        // DBSIZE counts every key in the logical database, not only ours.
        let entries: Option<u64> = redis::cmd("DBSIZE").query_async(&mut conn).await.ok();
        Ok(self.stats.snapshot(entries))
    }
}

/// Strip credentials from a Redis URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
