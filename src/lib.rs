//! # tagged-blog
//!
//! Tagged content service: relevance-ranked listings, sequential ids and
//! signed admin sessions.
//!
//! ## Core Contract
//!
//! 1. A tag query lists items ranked by how many query tags they share,
//!    paginated with a page count computed from the same predicate
//! 2. Every created item gets an id strictly greater than any issued before
//! 3. Mutations require a valid, unexpired session token
//!
//! ## Architecture
//!
//! ```text
//! read:   tag query → TagFilter → RankingEngine → RankedPage
//!                                      ↓
//!                      DocumentStore (Postgres or Memory)
//!                                      ↑
//! write:  token → AccessGate → SequenceAllocator → insert/replace/delete
//! ```
//!
//! ## Ordering Guarantees
//!
//! - Filtered listings: commonality desc, then published_at desc, then id desc
//! - Unfiltered listings: published_at desc, then id desc
//! - Page boundaries are stable for an unchanged store

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod blog;
pub mod config;
pub mod error;
pub mod ranking;
pub mod sequence;
pub mod store;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use access::{AccessGate, AccessState, SessionToken, TokenError};
pub use blog::Blog;
pub use config::{BlogConfig, ConfigError};
pub use error::BlogError;
pub use ranking::{page_count, rank_order, PageWindow, RankingEngine, TagFilter};
pub use sequence::SequenceAllocator;
pub use store::{DocumentStore, InMemoryDocumentStore};
#[cfg(feature = "postgres")]
pub use store::PostgresDocumentStore;
pub use types::{
    normalize_tags, AdminView, ContentItem, ItemDraft, ItemForm, ItemId, PageSize, RankedItem,
    RankedPage, TagSet,
};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};
