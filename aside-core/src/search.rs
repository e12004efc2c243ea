//! Search parameters and result pages.

use serde::{Deserialize, Serialize};

/// Page size used when the caller supplies zero or a negative value.
pub const DEFAULT_MAX_PER_PAGE: u64 = 5;

/// Page count used when the caller supplies zero or a negative value.
pub const DEFAULT_MAX_PAGES: u64 = 1;

/// Caller-supplied search tuning, exactly as decoded from the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub max_per_page: i64,
    #[serde(default)]
    pub max_pages: i64,
}

impl SearchParams {
    pub fn new(max_per_page: i64, max_pages: i64) -> Self {
        Self {
            max_per_page,
            max_pages,
        }
    }

    /// Substitute defaults for non-positive values.
    pub fn with_default_limits(&self) -> PageLimits {
        PageLimits {
            max_per_page: positive_or(self.max_per_page, DEFAULT_MAX_PER_PAGE),
            max_pages: positive_or(self.max_pages, DEFAULT_MAX_PAGES),
        }
    }
}

fn positive_or(value: i64, default: u64) -> u64 {
    if value <= 0 {
        default
    } else {
        value as u64
    }
}

/// Effective limits handed to a paginated producer. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub max_per_page: u64,
    pub max_pages: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        SearchParams::default().with_default_limits()
    }
}

/// One page of search results in producer delivery order.
///
/// Items are kept as the upstream delivered them; the engine never inspects
/// or reorders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Token that requested this page (`None` for the first page).
    #[serde(default)]
    pub page_token: Option<String>,
    /// Token for the next page, if upstream has more.
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl SearchPage {
    pub fn new(items: Vec<serde_json::Value>) -> Self {
        Self {
            page_token: None,
            next_page_token: None,
            items,
        }
    }
}
