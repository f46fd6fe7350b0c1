//! Relevance ranking and pagination.
//!
//! ## Ordering
//!
//! ```text
//! unfiltered:  published_at DESC, id DESC
//! filtered:    commonality DESC, published_at DESC, id DESC
//! ```
//!
//! where commonality is `|item.tags ∩ filter|`. A filtered query excludes
//! items with zero commonality outright. The final `id DESC` key makes the
//! order total, so page boundaries never depend on storage iteration order.
//!
//! ## Pagination
//!
//! The same [`TagFilter`] value feeds both the count and the fetch, so the page
//! count and the page contents are always computed from one predicate.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::BlogError;
use crate::store::DocumentStore;
use crate::types::{ContentItem, PageSize, RankedItem, RankedPage, TagSet};

/// Candidate predicate for a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: TagSet,
}

impl TagFilter {
    /// Filter on the given normalized tags. An empty set matches everything.
    pub fn new(tags: TagSet) -> Self {
        Self { tags }
    }

    /// Parse a raw tag query.
    pub fn parse(raw: &str) -> Self {
        Self::new(TagSet::parse(raw))
    }

    /// Filter matching every item.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter tags.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Whether this filter matches every item.
    pub fn is_unfiltered(&self) -> bool {
        self.tags.is_empty()
    }

    /// The candidate predicate.
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.is_unfiltered() || item.tags.intersects(&self.tags)
    }

    /// Commonality count of `item` against this filter.
    pub fn commonality(&self, item: &ContentItem) -> u64 {
        item.tags.intersection_count(&self.tags) as u64
    }

    /// Score an item, or `None` if it is not a candidate.
    pub fn rank(&self, item: ContentItem) -> Option<RankedItem> {
        if !self.matches(&item) {
            return None;
        }
        let commonality = self.commonality(&item);
        Some(RankedItem { item, commonality })
    }
}

/// Total rank order: commonality desc, then recency desc, then id desc.
///
/// `Ordering::Less` means `a` ranks before `b`.
pub fn rank_order(a: &RankedItem, b: &RankedItem) -> Ordering {
    b.commonality
        .cmp(&a.commonality)
        .then_with(|| b.item.published_at.cmp(&a.item.published_at))
        .then_with(|| b.item.id.cmp(&a.item.id))
}

/// Skip/limit window for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Candidates to skip.
    pub skip: u64,
    /// Maximum candidates to take.
    pub limit: u64,
}

impl PageWindow {
    /// Window for a 1-based page number. Page numbers below 1 clamp to the first page.
    pub fn for_page(page: i64, size: PageSize) -> Self {
        let index = u64::try_from(page.saturating_sub(1)).unwrap_or(0);
        Self {
            skip: index.saturating_mul(size.get()),
            limit: size.get(),
        }
    }

    /// Apply the window to an already ranked slice.
    pub fn apply<T: Clone>(&self, ranked: &[T]) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        ranked.iter().skip(skip).take(limit).cloned().collect()
    }
}

/// `ceil(matching / size)`.
pub fn page_count(matching: u64, size: PageSize) -> u64 {
    matching.div_ceil(size.get())
}

/// Ranking and pagination engine over a document store.
pub struct RankingEngine<S: DocumentStore> {
    store: Arc<S>,
    page_size: PageSize,
}

impl<S: DocumentStore> RankingEngine<S> {
    /// Create an engine with a validated page size.
    pub fn new(store: Arc<S>, page_size: PageSize) -> Self {
        Self { store, page_size }
    }

    /// Configured page size.
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Fetch one ranked page.
    ///
    /// A page past the end yields no items but still reports the page count.
    /// Store failures surface once, unretried.
    pub async fn rank(&self, filter: &TagFilter, page: i64, title: &str) -> Result<RankedPage, BlogError> {
        let matching_count = self
            .store
            .count_matching(filter)
            .await
            .map_err(BlogError::from_store)?;

        let window = PageWindow::for_page(page, self.page_size);
        let items = if window.skip < matching_count {
            self.store
                .fetch_ranked(filter, window)
                .await
                .map_err(BlogError::from_store)?
        } else {
            Vec::new()
        };

        debug_assert!(items.iter().all(|r| filter.matches(&r.item)));

        let page_count = page_count(matching_count, self.page_size);
        tracing::debug!(
            page,
            page_count,
            matching_count,
            returned = items.len(),
            filter = %filter.tags(),
            "Ranked page fetched"
        );

        Ok(RankedPage {
            title: title.to_string(),
            items,
            page_number: page,
            page_count,
            matching_count,
            tags: filter.tags().as_slice().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemDraft, ItemId};
    use chrono::{DateTime, Utc};

    fn item(id: i64, tags: &str, ts: i64) -> ContentItem {
        ContentItem::from_draft(
            ItemId::new(id),
            ItemDraft::new("t", "b", tags).unwrap(),
            DateTime::<Utc>::from_timestamp(ts, 0).unwrap(),
        )
    }

    #[test]
    fn test_window_math() {
        let size = PageSize::new(5).unwrap();
        assert_eq!(PageWindow::for_page(1, size), PageWindow { skip: 0, limit: 5 });
        assert_eq!(PageWindow::for_page(3, size), PageWindow { skip: 10, limit: 5 });
    }

    #[test]
    fn test_window_clamps_non_positive_pages() {
        let size = PageSize::new(5).unwrap();
        assert_eq!(PageWindow::for_page(0, size).skip, 0);
        assert_eq!(PageWindow::for_page(-7, size).skip, 0);
        assert_eq!(PageWindow::for_page(i64::MIN, size).skip, 0);
    }

    #[test]
    fn test_window_saturates_on_huge_pages() {
        let size = PageSize::new(100).unwrap();
        assert_eq!(PageWindow::for_page(i64::MAX, size).skip, u64::MAX);
    }

    #[test]
    fn test_page_count() {
        let size = PageSize::new(2).unwrap();
        assert_eq!(page_count(0, size), 0);
        assert_eq!(page_count(1, size), 1);
        assert_eq!(page_count(2, size), 1);
        assert_eq!(page_count(3, size), 2);
    }

    #[test]
    fn test_filter_excludes_non_intersecting() {
        let filter = TagFilter::parse("b");
        assert!(filter.rank(item(1, "a b", 0)).is_some());
        assert!(filter.rank(item(2, "c", 0)).is_none());
        assert!(TagFilter::all().rank(item(2, "c", 0)).is_some());
    }

    #[test]
    fn test_rank_order_keys() {
        let filter = TagFilter::parse("a b");
        let two_old = filter.rank(item(1, "a b", 10)).unwrap();
        let one_new = filter.rank(item(2, "a", 20)).unwrap();
        let one_new_higher_id = filter.rank(item(3, "b", 20)).unwrap();

        let mut ranked = vec![one_new.clone(), two_old.clone(), one_new_higher_id.clone()];
        ranked.sort_by(rank_order);

        let ids: Vec<i64> = ranked.iter().map(|r| r.item.id.get()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_unfiltered_commonality_is_zero() {
        let ranked = TagFilter::all().rank(item(1, "a b", 0)).unwrap();
        assert_eq!(ranked.commonality, 0);
    }
}
