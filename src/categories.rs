//! Category list and the single-select browse filter.
//!
//! The category list is fetched once from the collaborator and cached; the
//! filter itself is exclusive (one active category or "all") and every
//! selection re-issues the scoped feed query, even when the selection did
//! not change. Multi-select category state exists only on the compose form
//! (`feed::NewPost`), not here.

use crate::api::{ApiClient, ApiError, Category};
use crate::error::ValidationError;
use crate::feed::{FeedScope, FeedStore, LoadOutcome, Post};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum FilterError {
    /// The requested category id is not in the server's category list.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The scoped reload failed; the previous feed collection is intact.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// Category Filter
// ============================================================================

/// Selected-category view state plus the cached category list.
#[derive(Default)]
pub struct CategoryFilter {
    categories: Vec<Category>,
    loaded: bool,
    selected: Option<String>,
}

impl CategoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached category list, in server order. Empty until loaded.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// The active filter, or `None` for "all posts".
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fetches and caches the category list.
    ///
    /// A failed fetch leaves `loaded` false so the caller can retry; a
    /// successful re-load replaces the cache.
    pub async fn load(&mut self, api: &ApiClient) -> Result<usize, ApiError> {
        let categories = api.fetch_categories().await?;
        let count = categories.len();
        self.categories = categories;
        self.loaded = true;
        tracing::debug!(count, "Category list loaded");
        Ok(count)
    }

    /// Selects one category and reloads the feed scoped to it.
    ///
    /// Deliberately not short-circuited on re-selecting the active
    /// category: every click re-queries the source. The selection sticks
    /// even if the reload fails, so a retry re-queries the same scope.
    pub async fn select_category(
        &mut self,
        api: &ApiClient,
        store: &mut FeedStore,
        category_id: &str,
    ) -> Result<LoadOutcome, FilterError> {
        if self.loaded && !self.categories.iter().any(|c| c.id == category_id) {
            return Err(ValidationError::UnknownCategory(category_id.to_string()).into());
        }

        self.selected = Some(category_id.to_string());
        let scope = FeedScope::Category(category_id.to_string());
        let token = store.begin_reload(&scope);
        let result = api.fetch_posts_by_category(category_id).await;
        let outcome = store.complete_reload(
            token,
            result.map(|wire| wire.into_iter().map(Post::from).collect()),
        )?;
        Ok(outcome)
    }

    /// Clears the filter and reloads the whole feed.
    pub async fn select_all(
        &mut self,
        api: &ApiClient,
        store: &mut FeedStore,
    ) -> Result<LoadOutcome, ApiError> {
        self.selected = None;
        let token = store.begin_reload(&FeedScope::All);
        let result = api.fetch_posts().await;
        store.complete_reload(
            token,
            result.map(|wire| wire.into_iter().map(Post::from).collect()),
        )
    }

    /// The feed scope implied by the current selection. Used for refresh
    /// operations that re-query whatever the viewer is looking at.
    pub fn current_scope(&self) -> FeedScope {
        match &self.selected {
            Some(id) => FeedScope::Category(id.clone()),
            None => FeedScope::All,
        }
    }
}
