//! aside producers - HTTP sources of truth invoked on a cache miss
//!
//! - [`HttpFetcher`]: single-shot GET of a URL, body returned verbatim.
//! - [`HttpSearchClient`]: paginated JSON keyword search, first page eager,
//!   later pages fetched lazily as the stream is polled.

pub mod fetch;
pub mod search;

pub use fetch::HttpFetcher;
pub use search::HttpSearchClient;

/// `"404 Not Found"` style status line for upstream errors.
pub(crate) fn status_line(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
