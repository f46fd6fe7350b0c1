//! Core operations of the blog.
//!
//! Reads (`list_items`, `get_item`) never consult the access gate. Every
//! mutation, plus the admin view and edit-form prefill, takes the caller's
//! [`AccessState`] and checks it before touching the store.

use std::sync::Arc;

use chrono::Utc;

use crate::access::{AccessGate, AccessState, SessionToken};
use crate::config::BlogConfig;
use crate::error::BlogError;
use crate::ranking::{RankingEngine, TagFilter};
use crate::sequence::SequenceAllocator;
use crate::store::DocumentStore;
use crate::types::{AdminView, ContentItem, ItemDraft, ItemForm, ItemId, PageSize, RankedPage};

/// Blog facade over a document store.
pub struct Blog<S: DocumentStore> {
    store: Arc<S>,
    ranking: RankingEngine<S>,
    allocator: SequenceAllocator<S>,
    gate: AccessGate,
    title: String,
}

impl<S: DocumentStore> Blog<S> {
    /// Wire the core from startup configuration.
    pub fn new(store: Arc<S>, config: &BlogConfig) -> Self {
        Self {
            ranking: RankingEngine::new(Arc::clone(&store), config.page_size),
            allocator: SequenceAllocator::new(Arc::clone(&store)),
            gate: AccessGate::from_config(config),
            title: config.title.clone(),
            store,
        }
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the access gate.
    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// Configured blog title.
    pub fn blog_title(&self) -> &str {
        &self.title
    }

    /// Configured page size.
    pub fn page_size(&self) -> PageSize {
        self.ranking.page_size()
    }

    /// Evaluate a client-presented session token.
    pub fn access(&self, presented: Option<&str>) -> AccessState {
        self.gate.evaluate(presented)
    }

    /// List one ranked page for a raw tag query.
    pub async fn list_items(&self, tag_query: &str, page: i64) -> Result<RankedPage, BlogError> {
        let filter = TagFilter::parse(tag_query);
        self.ranking.rank(&filter, page, &self.title).await.map_err(|e| {
            tracing::error!(error = %e, page, "Listing failed");
            e
        })
    }

    /// Fetch a single item.
    pub async fn get_item(&self, id: ItemId) -> Result<ContentItem, BlogError> {
        self.store
            .get_item(id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, id = %id, "Item lookup failed");
                BlogError::from_store(e)
            })?
            .ok_or(BlogError::NotFound(id))
    }

    /// Create an item and return its newly allocated id.
    ///
    /// The id is allocated before the insert; if allocation fails nothing is
    /// written.
    pub async fn create_item(
        &self,
        access: AccessState,
        title: &str,
        body: &str,
        tags_raw: &str,
    ) -> Result<ItemId, BlogError> {
        access.require()?;
        let draft = ItemDraft::new(title, body, tags_raw)?;

        let id = self.allocator.allocate().await?;
        let item = ContentItem::from_draft(id, draft, Utc::now());
        self.store.insert_item(&item).await.map_err(|e| {
            tracing::error!(error = %e, id = %id, "Insert failed after id allocation");
            BlogError::from_store(e)
        })?;

        tracing::info!(id = %id, tags = %item.tags, "Item created");
        Ok(id)
    }

    /// Overwrite every field of an existing item. The timestamp becomes now.
    pub async fn update_item(
        &self,
        id: ItemId,
        access: AccessState,
        title: &str,
        body: &str,
        tags_raw: &str,
    ) -> Result<(), BlogError> {
        access.require()?;
        let draft = ItemDraft::new(title, body, tags_raw)?;

        let item = ContentItem::from_draft(id, draft, Utc::now());
        let replaced = self.store.replace_item(&item).await.map_err(|e| {
            tracing::error!(error = %e, id = %id, "Update failed");
            BlogError::from_store(e)
        })?;

        if !replaced {
            return Err(BlogError::NotFound(id));
        }
        tracing::info!(id = %id, "Item updated");
        Ok(())
    }

    /// Delete an item. Deleting an absent id succeeds.
    pub async fn delete_item(&self, id: ItemId, access: AccessState) -> Result<(), BlogError> {
        access.require()?;

        let removed = self.store.delete_item(id).await.map_err(|e| {
            tracing::error!(error = %e, id = %id, "Delete failed");
            BlogError::from_store(e)
        })?;

        if removed {
            tracing::info!(id = %id, "Item deleted");
        } else {
            tracing::debug!(id = %id, "Delete of absent item");
        }
        Ok(())
    }

    /// Check credentials and issue a session token.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<SessionToken, BlogError> {
        self.gate.authenticate(login, password)
    }

    /// Data for the admin landing view.
    pub async fn admin_view(&self, access: AccessState) -> Result<AdminView, BlogError> {
        access.require()?;
        let item_count = self
            .store
            .count_matching(&TagFilter::all())
            .await
            .map_err(BlogError::from_store)?;

        Ok(AdminView {
            blog_title: self.title.clone(),
            item_count,
        })
    }

    /// Prefill for the edit form of an existing item.
    pub async fn item_form(&self, id: ItemId, access: AccessState) -> Result<ItemForm, BlogError> {
        access.require()?;
        self.get_item(id).await.map(ItemForm::from)
    }

    /// Check if the store is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.store.is_healthy().await
    }
}
