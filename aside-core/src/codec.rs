//! Result codec.
//!
//! Cached values are stored in the exact form written to the HTTP response
//! body: raw bytes for fetches, a JSON array of [`SearchPage`] objects for
//! searches. A cache hit is therefore served without decoding.

use crate::error::CodecError;
use crate::search::SearchPage;

/// Serialize drained pages in delivery order.
pub fn encode_pages(pages: &[SearchPage]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(pages).map_err(|e| CodecError::Encode {
        reason: e.to_string(),
    })
}

/// Deserialize a cached page sequence.
pub fn decode_pages(bytes: &[u8]) -> Result<Vec<SearchPage>, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
        reason: e.to_string(),
    })
}

/// Fetch results are cached as-is.
pub fn encode_blob(blob: Vec<u8>) -> Vec<u8> {
    blob
}
