//! Resolution results.
//!
//! Every successful resolution reports where its bytes came from so the HTTP
//! layer can set `x-cache` and metrics can count outcomes.

use serde::Serialize;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Non-empty value found in the store.
    Cache,
    /// This call ran the producer.
    Producer,
    /// Another in-flight call for the same key ran the producer.
    Coalesced,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Producer => "producer",
            Self::Coalesced => "coalesced",
        }
    }

    /// True if the value was served from the store.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Cache)
    }

    /// `x-cache` header value and metric outcome: `hit` for the store,
    /// `miss` for anything the producer computed.
    pub fn cache_label(&self) -> &'static str {
        if self.is_hit() {
            "hit"
        } else {
            "miss"
        }
    }
}

/// Bytes returned by a resolution, with their provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    value: Vec<u8>,
    source: ResolutionSource,
}

impl Resolution {
    pub fn from_cache(value: Vec<u8>) -> Self {
        Self {
            value,
            source: ResolutionSource::Cache,
        }
    }

    pub fn from_producer(value: Vec<u8>) -> Self {
        Self {
            value,
            source: ResolutionSource::Producer,
        }
    }

    pub fn coalesced(value: Vec<u8>) -> Self {
        Self {
            value,
            source: ResolutionSource::Coalesced,
        }
    }

    pub fn source(&self) -> ResolutionSource {
        self.source
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }
}
