//! Shared service state.

use std::sync::Arc;

use crate::blog::Blog;
use crate::config::BlogConfig;
use crate::store::DocumentStore;

/// Shared service state.
///
/// Wraps the blog core; cloned into every handler.
pub struct ServiceState<S: DocumentStore> {
    /// The blog core.
    pub blog: Arc<Blog<S>>,
}

impl<S: DocumentStore> ServiceState<S> {
    /// Create service state around an already wired core.
    pub fn new(blog: Blog<S>) -> Self {
        Self {
            blog: Arc::new(blog),
        }
    }

    /// Wire the core over `store` from startup configuration.
    pub fn from_config(store: S, config: &BlogConfig) -> Self {
        Self::new(Blog::new(Arc::new(store), config))
    }
}

impl<S: DocumentStore> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            blog: Arc::clone(&self.blog),
        }
    }
}
