//! Sequential id allocation.
//!
//! Ids come from the store's atomic increment-or-upsert primitive, so every
//! allocation is durable before the caller sees it. Creation always runs
//! allocate-then-insert; a failed allocation aborts the create and nothing is
//! persisted.

use std::sync::Arc;

use crate::error::BlogError;
use crate::store::DocumentStore;
use crate::types::ItemId;

/// Issues unique, strictly increasing item ids.
pub struct SequenceAllocator<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> SequenceAllocator<S> {
    /// Create an allocator over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Allocate the next id.
    ///
    /// The result is greater than every id returned before and than any id
    /// already stored when the sequence was first used.
    pub async fn allocate(&self) -> Result<ItemId, BlogError> {
        let raw = self.store.next_sequence().await.map_err(|e| {
            tracing::error!(error = %e, "Id allocation failed");
            BlogError::from_store(e)
        })?;
        tracing::debug!(id = raw, "Allocated item id");
        Ok(ItemId::new(raw))
    }
}

impl<S: DocumentStore> Clone for SequenceAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}
