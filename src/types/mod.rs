//! Core types for the tagged content service.

pub mod item;
pub mod page;
pub mod tags;

pub use item::{AdminView, ContentItem, ItemDraft, ItemForm, ItemId};
pub use page::{PageSize, RankedItem, RankedPage};
pub use tags::{normalize_tags, TagSet};
