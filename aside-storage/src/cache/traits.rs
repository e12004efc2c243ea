//! Cache store trait and shared statistics.
//!
//! This module defines the contract every backing store implements. The
//! resolver only talks to stores through [`CacheStore`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use aside_core::{CacheKey, StoreError};
use serde::Serialize;

/// Write semantics a backing store provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Network cache whose writes may silently fail.
    BestEffort,
    /// Local store with atomic reads and committed writes.
    Transactional,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestEffort => "best_effort",
            Self::Transactional => "transactional",
        }
    }
}

/// Cache store trait for pluggable backing stores.
///
/// Implementations own their storage handle and must be safe to share
/// across concurrently executing resolutions. Reads and writes to different
/// keys must not block each other.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The write semantics of this store.
    fn kind(&self) -> StoreKind;

    /// Get the stored value for a key.
    ///
    /// Fails with [`StoreError::NotFound`] when absent and
    /// [`StoreError::Unavailable`] on I/O or connection errors.
    async fn get(&self, key: &CacheKey) -> Result<Vec<u8>, StoreError>;

    /// Store a value for a key.
    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError>;

    /// Remove a key. Returns true if an entry was removed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError>;

    /// Get store statistics.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Statistics about store usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    /// Number of entries, when the store can count them cheaply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<u64>,
}

impl StoreStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters shared by the store implementations.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entry_count: Option<u64>) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            entry_count,
        }
    }
}
