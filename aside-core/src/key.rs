//! Cache keys and the key normalizer.
//!
//! A [`CacheKey`] is the verbatim request input (a URL for fetches, the
//! keyword string for searches) tagged with the [`KeyNamespace`] it belongs
//! to. Normalization never rewrites the input: two queries that differ only
//! in case or surrounding whitespace are different keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Separator between the namespace prefix and the key bytes.
const SEPARATOR: u8 = b':';

/// Marker placed after the separator when the raw bytes were replaced by a digest.
const DIGEST_MARKER: &[u8] = b"#sha256:";

/// Which resolution variant a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyNamespace {
    /// Byte-blob fetches keyed by URL.
    Fetch,
    /// Paginated searches keyed by keyword string.
    Search,
}

impl KeyNamespace {
    /// Storage prefix for this namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Search => "search",
        }
    }

    /// Parse a namespace from its path segment form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fetch" => Some(Self::Fetch),
            "search" => Some(Self::Search),
            _ => None,
        }
    }
}

impl fmt::Display for KeyNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolvable request key.
///
/// Constructed through [`CacheKey::fetch`], [`CacheKey::search`] or
/// [`normalize`]; the raw bytes are exactly what the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: KeyNamespace,
    raw: Vec<u8>,
}

impl CacheKey {
    /// Key for a fetch request. The URL is the key verbatim.
    pub fn fetch(url: impl Into<String>) -> Self {
        Self {
            namespace: KeyNamespace::Fetch,
            raw: url.into().into_bytes(),
        }
    }

    /// Key for a search request. The keyword string is the key verbatim.
    pub fn search(keywords: impl Into<String>) -> Self {
        Self {
            namespace: KeyNamespace::Search,
            raw: keywords.into().into_bytes(),
        }
    }

    pub fn namespace(&self) -> KeyNamespace {
        self.namespace
    }

    /// The verbatim key bytes, without namespace.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Lossy UTF-8 view of the key, for logs and upstream requests.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// Encode the key for a backend that accepts at most `max_len` key bytes.
    ///
    /// Format: `<namespace>:<raw bytes>`. If that would exceed `max_len`, the
    /// raw bytes are replaced with `#sha256:<hex digest>`.
    pub fn encode(&self, max_len: usize) -> Vec<u8> {
        let prefix = self.namespace.as_str().as_bytes();
        let full_len = prefix.len() + 1 + self.raw.len();

        let mut out = Vec::with_capacity(full_len.min(max_len));
        out.extend_from_slice(prefix);
        out.push(SEPARATOR);

        if full_len <= max_len {
            out.extend_from_slice(&self.raw);
        } else {
            let digest = Sha256::digest(&self.raw);
            out.extend_from_slice(DIGEST_MARKER);
            out.extend_from_slice(hex::encode(digest).as_bytes());
        }
        out
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.as_str_lossy())
    }
}

/// Derive the cache key for raw request input. Pure and infallible.
pub fn normalize(namespace: KeyNamespace, raw_input: &str) -> CacheKey {
    match namespace {
        KeyNamespace::Fetch => CacheKey::fetch(raw_input),
        KeyNamespace::Search => CacheKey::search(raw_input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_search_key_is_case_sensitive() {
        let lower = normalize(KeyNamespace::Search, "golang concurrency");
        let upper = normalize(KeyNamespace::Search, "Golang Concurrency");
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_search_key_keeps_whitespace() {
        let key = normalize(KeyNamespace::Search, "  rust  ");
        assert_eq!(key.as_bytes(), b"  rust  ");
        assert_ne!(key, normalize(KeyNamespace::Search, "rust"));
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let fetch = CacheKey::fetch("same");
        let search = CacheKey::search("same");
        assert_ne!(fetch, search);
        assert_ne!(fetch.encode(511), search.encode(511));
    }

    #[test]
    fn test_encode_short_key() {
        let key = CacheKey::fetch("https://example.com/a");
        assert_eq!(key.encode(511), b"fetch:https://example.com/a".to_vec());
    }

    #[test]
    fn test_encode_long_key_uses_digest() {
        let url = format!("https://example.com/{}", "x".repeat(600));
        let encoded = CacheKey::fetch(url.clone()).encode(511);
        assert!(encoded.len() <= 511);
        assert!(encoded.starts_with(b"fetch:#sha256:"));
        // 64 hex chars of digest
        assert_eq!(encoded.len(), "fetch:#sha256:".len() + 64);
        assert_eq!(encoded, CacheKey::fetch(url).encode(511));
    }

    #[test]
    fn test_namespace_parse() {
        assert_eq!(KeyNamespace::parse("fetch"), Some(KeyNamespace::Fetch));
        assert_eq!(KeyNamespace::parse("search"), Some(KeyNamespace::Search));
        assert_eq!(KeyNamespace::parse("Search"), None);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_verbatim(input in ".{0,200}") {
            let key = normalize(KeyNamespace::Search, &input);
            prop_assert_eq!(key.as_bytes(), input.as_bytes());
        }

        #[test]
        fn prop_encode_respects_max_len(input in ".{0,800}") {
            let encoded = normalize(KeyNamespace::Fetch, &input).encode(511);
            prop_assert!(encoded.len() <= 511);
        }
    }
}
