//! Page types for ranked listings.

use serde::{Deserialize, Serialize};

use super::item::ContentItem;
use crate::config::ConfigError;

/// Fixed number of items per page.
///
/// Validated once at startup; a non-positive size is a configuration error,
/// never a per-request one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PageSize(u32);

impl PageSize {
    /// Page size used when none is configured.
    pub const DEFAULT: PageSize = PageSize(8);

    /// Validate a configured page size.
    pub fn new(size: i64) -> Result<Self, ConfigError> {
        if size <= 0 {
            return Err(ConfigError::InvalidPageSize(size));
        }
        u32::try_from(size)
            .map(Self)
            .map_err(|_| ConfigError::InvalidPageSize(size))
    }

    /// Size as a count.
    pub fn get(&self) -> u64 {
        u64::from(self.0)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for PageSize {
    type Error = ConfigError;

    fn try_from(size: i64) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl From<PageSize> for i64 {
    fn from(size: PageSize) -> Self {
        i64::from(size.0)
    }
}

/// An item together with its commonality count against the active filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    /// The item itself.
    #[serde(flatten)]
    pub item: ContentItem,
    /// Number of filter tags the item carries (0 when unfiltered).
    pub commonality: u64,
}

/// One page of ranked results plus the data needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPage {
    /// Blog title for the listing header.
    pub title: String,
    /// Items on this page, in rank order.
    pub items: Vec<RankedItem>,
    /// Requested 1-based page number, as given.
    pub page_number: i64,
    /// `ceil(matching_count / page_size)`.
    pub page_count: u64,
    /// Size of the candidate set.
    pub matching_count: u64,
    /// Normalized filter tags.
    pub tags: Vec<String>,
}

impl RankedPage {
    /// Previous page number, if there is one.
    pub fn prev_page(&self) -> Option<i64> {
        (self.page_number > 1).then(|| self.page_number - 1)
    }

    /// Next page number, if there is one.
    pub fn next_page(&self) -> Option<i64> {
        let next = self.page_number.max(0).saturating_add(1);
        (u64::try_from(next).unwrap_or(u64::MAX) <= self.page_count).then_some(next)
    }

    /// Whether the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
