//! In-memory document store for testing and single-process use.
//!
//! The id sequence is guarded by a process-local mutex held across the whole
//! read-increment-write step. That is only correct while this process is the
//! sole writer; multi-process deployments use the Postgres store, whose
//! sequence is advanced by a single atomic statement.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::DocumentStore;
use crate::ranking::{rank_order, PageWindow, TagFilter};
use crate::types::{ContentItem, ItemId, RankedItem};

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// An item with this id already exists.
    #[error("Duplicate item id: {0}")]
    DuplicateId(ItemId),
    /// Store was switched off with [`InMemoryDocumentStore::set_unavailable`].
    #[error("Store unavailable")]
    Unavailable,
    /// The id sequence reached `i64::MAX`.
    #[error("Id sequence exhausted")]
    SequenceExhausted,
}

/// In-memory document store.
///
/// Uses a BTreeMap for deterministic iteration order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    /// Items by id.
    items: RwLock<BTreeMap<ItemId, ContentItem>>,
    /// Last issued id; `None` until the first allocation.
    sequence: Mutex<Option<i64>>,
    /// Fault injection switch.
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with items.
    pub fn with_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        let store = Self::new();
        for item in items {
            store.add_item(item);
        }
        store
    }

    /// Add or overwrite an item directly, bypassing the sequence.
    pub fn add_item(&self, item: ContentItem) {
        self.items.write().insert(item.id, item);
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Last issued sequence value, if any.
    pub fn sequence_value(&self) -> Option<i64> {
        *self.sequence.lock()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), InMemoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InMemoryError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    type Error = InMemoryError;

    async fn count_matching(&self, filter: &TagFilter) -> Result<u64, Self::Error> {
        self.check_available()?;
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| filter.matches(item))
            .count() as u64)
    }

    async fn fetch_ranked(
        &self,
        filter: &TagFilter,
        window: PageWindow,
    ) -> Result<Vec<RankedItem>, Self::Error> {
        self.check_available()?;
        let mut ranked: Vec<RankedItem> = self
            .items
            .read()
            .values()
            .cloned()
            .filter_map(|item| filter.rank(item))
            .collect();

        ranked.sort_by(rank_order);

        Ok(window.apply(&ranked))
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>, Self::Error> {
        self.check_available()?;
        Ok(self.items.read().get(&id).cloned())
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), Self::Error> {
        self.check_available()?;
        let mut items = self.items.write();
        if items.contains_key(&item.id) {
            return Err(InMemoryError::DuplicateId(item.id));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn replace_item(&self, item: &ContentItem) -> Result<bool, Self::Error> {
        self.check_available()?;
        let mut items = self.items.write();
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, Self::Error> {
        self.check_available()?;
        Ok(self.items.write().remove(&id).is_some())
    }

    async fn next_sequence(&self) -> Result<i64, Self::Error> {
        self.check_available()?;
        let mut sequence = self.sequence.lock();
        let last = match *sequence {
            Some(last) => last,
            // Lazily created: start above whatever is already stored.
            None => self
                .items
                .read()
                .keys()
                .next_back()
                .map(|id| id.get())
                .unwrap_or(0)
                .max(0),
        };
        let next = last.checked_add(1).ok_or(InMemoryError::SequenceExhausted)?;
        *sequence = Some(next);
        Ok(next)
    }

    async fn is_healthy(&self) -> bool {
        self.check_available().is_ok()
    }
}
