//! LMDB-backed transactional cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) as the embedded key-value
//! store behind search results.
//!
//! # Transactions
//!
//! - `get` runs inside a read transaction. LMDB readers never block writers
//!   or each other.
//! - `set` opens a write transaction, checks for an existing non-empty
//!   value, puts, and commits. The first committed value for a key wins.
//! - `delete` commits a single-key delete.
//!
//! Statistics are tracked with atomic counters.

use std::path::Path;

use async_trait::async_trait;
use aside_core::{CacheKey, StoreError};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{CacheStore, StatsRecorder, StoreKind, StoreStats};

/// Largest key LMDB accepts with its default build options.
pub const LMDB_MAX_KEY_SIZE: usize = 511;

/// Error type for opening the LMDB store.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        StoreError::unavailable(e.to_string())
    }
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use aside_storage::LmdbStore;
///
/// let store = LmdbStore::open("/var/lib/aside/cache", 256)?;
/// store.set(&CacheKey::search("golang concurrency"), &pages).await?;
/// ```
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    stats: StatsRecorder,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            LmdbStoreError::EnvOpen(format!("map size of {} MB overflows", max_size_mb))
        })?;

        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        tracing::info!(path = %path.as_ref().display(), max_size_mb, "LMDB cache store opened");

        Ok(Self {
            env,
            db,
            stats: StatsRecorder::default(),
        })
    }

    /// Flush dirty pages to disk. Called on shutdown.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.env
            .force_sync()
            .map_err(|e| StoreError::commit_failed(e.to_string()))
    }

    fn encode(key: &CacheKey) -> Vec<u8> {
        key.encode(LMDB_MAX_KEY_SIZE)
    }
}

#[async_trait]
impl CacheStore for LmdbStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Transactional
    }

    async fn get(&self, key: &CacheKey) -> Result<Vec<u8>, StoreError> {
        let encoded_key = Self::encode(key);

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        match self.db.get(&rtxn, &encoded_key) {
            Ok(Some(bytes)) => {
                self.stats.hit();
                Ok(bytes.to_vec())
            }
            Ok(None) => {
                self.stats.miss();
                Err(StoreError::NotFound)
            }
            Err(e) => {
                self.stats.miss();
                Err(StoreError::unavailable(e.to_string()))
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError> {
        let encoded_key = Self::encode(key);

        let result = (|| {
            let mut wtxn = self
                .env
                .write_txn()
                .map_err(|e| StoreError::commit_failed(e.to_string()))?;

            // An empty value counts as absent, so it may be replaced.
            let occupied = self
                .db
                .get(&wtxn, &encoded_key)
                .map_err(|e| StoreError::commit_failed(e.to_string()))?
                .is_some_and(|existing| !existing.is_empty());
            if occupied {
                return Ok(false);
            }

            self.db
                .put(&mut wtxn, &encoded_key, value)
                .map_err(|e| StoreError::commit_failed(e.to_string()))?;

            wtxn.commit()
                .map_err(|e| StoreError::commit_failed(e.to_string()))?;
            Ok(true)
        })();

        match result {
            Ok(true) => {
                self.stats.write();
                Ok(())
            }
            Ok(false) => {
                tracing::debug!(key = %key, "LMDB entry already committed, keeping first value");
                Ok(())
            }
            Err(e) => {
                self.stats.write_failure();
                Err(e)
            }
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let encoded_key = Self::encode(key);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| StoreError::commit_failed(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, &encoded_key)
            .map_err(|e| StoreError::commit_failed(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| StoreError::commit_failed(e.to_string()))?;

        Ok(deleted)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let entries = self
            .db
            .len(&rtxn)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(self.stats.snapshot(Some(entries)))
    }
}
