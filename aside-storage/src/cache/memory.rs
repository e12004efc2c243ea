//! In-process cache store.
//!
//! Used for local development and tests. Behaves like the transactional
//! store (first non-empty write wins) but keeps nothing across restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use aside_core::{CacheKey, StoreError};

use super::traits::{CacheStore, StatsRecorder, StoreKind, StoreStats};

/// HashMap-backed store guarded by a reader-writer lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
    stats: StatsRecorder,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Transactional
    }

    async fn get(&self, key: &CacheKey) -> Result<Vec<u8>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        match entries.get(key) {
            Some(value) => {
                self.stats.hit();
                Ok(value.clone())
            }
            None => {
                self.stats.miss();
                Err(StoreError::NotFound)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| {
            self.stats.write_failure();
            StoreError::LockPoisoned
        })?;

        let occupied = entries.get(key).is_some_and(|existing| !existing.is_empty());
        if !occupied {
            entries.insert(key.clone(), value.to_vec());
            self.stats.write();
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.remove(key).is_some())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let count = self.entries.read().map_err(|_| StoreError::LockPoisoned)?.len();
        Ok(self.stats.snapshot(Some(count as u64)))
    }
}
