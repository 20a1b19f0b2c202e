//! Lazy per-post comment threads.
//!
//! A thread is fetched once, on the first reveal, and cached for the
//! process lifetime; submitting a comment patches the cached thread and the
//! post's count locally instead of re-fetching. Thread entries survive feed
//! reloads (the association to a post is by id only) and are never evicted.

use crate::api::{ApiClient, ApiError, WireComment};
use crate::error::ValidationError;
use crate::feed::FeedStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CommentError {
    /// Empty content after trimming; nothing was sent to the server.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The remote call failed; thread cache and counts are unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// Data Types
// ============================================================================

/// One comment. Immutable once created; this core never edits or removes
/// comments and does not track their identity.
#[derive(Debug, Clone)]
pub struct Comment {
    pub author: Arc<str>,
    pub content: Arc<str>,
    pub created_at: DateTime<Utc>,
}

impl From<WireComment> for Comment {
    fn from(wire: WireComment) -> Self {
        Comment {
            author: Arc::from(wire.username),
            content: Arc::from(wire.content),
            created_at: wire.created_at,
        }
    }
}

/// The cached comment thread for one post.
#[derive(Debug, Default)]
pub struct CommentThread {
    pub comments: Vec<Comment>,
    /// True once the thread has been fetched successfully. A failed fetch
    /// leaves this false so a later reveal retries.
    pub loaded: bool,
}

/// What a reveal call did.
#[derive(Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    /// First successful reveal; the thread was fetched and cached.
    Loaded { comments: usize },
    /// The thread was already cached; no request was issued.
    AlreadyLoaded,
}

// ============================================================================
// Comment Panel Controller
// ============================================================================

/// Owns one [`CommentThread`] per revealed post, keyed by post id.
#[derive(Default)]
pub struct CommentPanel {
    threads: HashMap<String, CommentThread>,
}

impl CommentPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached thread for a post, if any reveal has been attempted.
    pub fn thread(&self, post_id: &str) -> Option<&CommentThread> {
        self.threads.get(post_id)
    }

    /// Reveals a post's comments, fetching the thread on first reveal.
    ///
    /// Idempotent: once loaded, further reveals return `AlreadyLoaded`
    /// without a network call. A failed fetch is soft; the thread stays
    /// unloaded and the error is surfaced so the next reveal retries.
    pub async fn reveal(
        &mut self,
        api: &ApiClient,
        post_id: &str,
    ) -> Result<RevealOutcome, ApiError> {
        if self.threads.get(post_id).is_some_and(|t| t.loaded) {
            tracing::trace!(post_id, "Thread already cached, skipping fetch");
            return Ok(RevealOutcome::AlreadyLoaded);
        }

        let wire = api.fetch_comments(post_id).await?;
        let comments: Vec<Comment> = wire.into_iter().map(Comment::from).collect();
        let count = comments.len();
        self.threads.insert(
            post_id.to_string(),
            CommentThread {
                comments,
                loaded: true,
            },
        );
        tracing::debug!(post_id, comments = count, "Comment thread loaded");
        Ok(RevealOutcome::Loaded { comments: count })
    }

    /// Submits a comment on a post.
    ///
    /// Content must be non-empty after trimming; the empty case is a
    /// client-side validation failure and no request is sent. On success the
    /// response's new total count is patched into the feed store, and the
    /// comment is appended to the cached thread (if one is loaded) from the
    /// just-submitted content, the given author, and the current time. The
    /// thread is never re-fetched for this.
    ///
    /// Returns the new total comment count.
    pub async fn submit(
        &mut self,
        api: &ApiClient,
        store: &mut FeedStore,
        post_id: &str,
        author: &str,
        content: &str,
    ) -> Result<u32, CommentError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }

        let comment_count = api.create_comment(post_id, content).await?;
        store.set_comment_count(post_id, comment_count);

        if let Some(thread) = self.threads.get_mut(post_id) {
            if thread.loaded {
                thread.comments.push(Comment {
                    author: Arc::from(author),
                    content: Arc::from(content),
                    created_at: Utc::now(),
                });
            }
        }

        tracing::debug!(post_id, comment_count, "Comment submitted");
        Ok(comment_count)
    }
}
