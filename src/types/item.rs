//! Content item types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tags::TagSet;
use crate::error::BlogError;

/// Unique identifier of a content item.
///
/// Issued by the sequence allocator; never reused, even after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Wrap a raw id.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// A persisted piece of tagged content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique id.
    pub id: ItemId,
    /// Title shown in listings.
    pub title: String,
    /// Body markup, stored verbatim (trusted).
    pub body: String,
    /// Normalized tags.
    pub tags: TagSet,
    /// Publication time; refreshed on every update.
    pub published_at: DateTime<Utc>,
}

impl ContentItem {
    /// Create an item from an already-validated draft.
    pub fn from_draft(id: ItemId, draft: ItemDraft, published_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            body: draft.body,
            tags: draft.tags,
            published_at,
        }
    }
}

/// Validated input for creating or replacing an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    /// Title (non-blank).
    pub title: String,
    /// Body markup.
    pub body: String,
    /// Normalized tags.
    pub tags: TagSet,
}

impl ItemDraft {
    /// Validate raw form input. Tags are normalized; the title must not be blank.
    pub fn new(title: &str, body: &str, tags_raw: &str) -> Result<Self, BlogError> {
        if title.trim().is_empty() {
            return Err(BlogError::Validation("title must not be empty".to_string()));
        }
        Ok(Self {
            title: title.to_string(),
            body: body.to_string(),
            tags: TagSet::parse(tags_raw),
        })
    }
}

/// Edit-form prefill for an existing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemForm {
    /// Item being edited.
    pub id: ItemId,
    /// Current title.
    pub title: String,
    /// Current body.
    pub body: String,
    /// Current tags, space separated.
    pub tags: String,
}

impl From<ContentItem> for ItemForm {
    fn from(item: ContentItem) -> Self {
        Self {
            id: item.id,
            tags: item.tags.joined(),
            title: item.title,
            body: item.body,
        }
    }
}

/// Data behind the admin landing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminView {
    /// Configured blog title.
    pub blog_title: String,
    /// Total number of stored items.
    pub item_count: u64,
}
