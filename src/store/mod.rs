//! Document storage backends.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::ranking::{PageWindow, TagFilter};
use crate::types::{ContentItem, ItemId, RankedItem};

/// Trait for document storage backends.
///
/// Implementations must order `fetch_ranked` results by
/// [`rank_order`](crate::ranking::rank_order) and must evaluate `count_matching`
/// and `fetch_ranked` with the same [`TagFilter::matches`] predicate.
///
/// No method applies its own timeout or retries; callers bound calls by
/// dropping the returned future.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Count the candidate set for `filter`.
    async fn count_matching(&self, filter: &TagFilter) -> Result<u64, Self::Error>;

    /// Fetch one window of the candidate set, in rank order.
    async fn fetch_ranked(
        &self,
        filter: &TagFilter,
        window: PageWindow,
    ) -> Result<Vec<RankedItem>, Self::Error>;

    /// Fetch an item by id.
    async fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>, Self::Error>;

    /// Insert a new item. The id must already be allocated.
    async fn insert_item(&self, item: &ContentItem) -> Result<(), Self::Error>;

    /// Replace every field of an existing item. Returns `false` if absent.
    async fn replace_item(&self, item: &ContentItem) -> Result<bool, Self::Error>;

    /// Delete an item. Returns `false` if absent.
    async fn delete_item(&self, id: ItemId) -> Result<bool, Self::Error>;

    /// Atomically advance the id sequence and return the new value.
    ///
    /// The sequence is created on first use, starting above any id already
    /// stored, and is never decremented or deleted.
    async fn next_sequence(&self) -> Result<i64, Self::Error>;

    /// Check if the store is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

pub use memory::InMemoryDocumentStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDocumentStore;
