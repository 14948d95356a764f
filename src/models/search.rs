//! Search request model shared by every source.

use serde::{Deserialize, Serialize};

/// Default recency window in days
pub const DEFAULT_DAYS: u32 = 30;

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Topic to search for
    pub topic: String,

    /// Only consider records added within this many days (sources that support it)
    pub days: u32,

    /// Restrict to review articles (sources that support it)
    pub reviews_only: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            topic: String::new(),
            days: DEFAULT_DAYS,
            reviews_only: false,
        }
    }
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Set the recency window
    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Enable/disable the review-only filter
    pub fn reviews_only(mut self, reviews_only: bool) -> Self {
        self.reviews_only = reviews_only;
        self
    }
}
