use crate::api::{ApiClient, ApiError};
use crate::feed::store::FeedStore;
use crate::feed::types::{ReactionKind, ViewerVote};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ReactError {
    /// The post id is not in the feed store, so there is nothing to react to.
    #[error("Unknown post: {0}")]
    UnknownPost(String),
    /// The reaction request failed; the post's fields are unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// Reaction Reconciliation
// ============================================================================

/// The server-confirmed state applied to the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionUpdate {
    pub likes: u32,
    pub dislikes: u32,
    pub viewer_vote: ViewerVote,
}

/// Sends a like/dislike and reconciles the post with the server's response.
///
/// Confirm-only: the post is not touched until the response returns, so
/// there is no rollback path. On success the response's `{likes, dislikes,
/// userVote}` triple replaces the post's reaction fields wholesale. On
/// failure the post is left unchanged and the error is propagated; no
/// retry is issued.
///
/// A second reaction for the same post may be sent before the first
/// resolves; whichever response completes last wins. Responses completing
/// out of order can therefore land a stale result. That hazard is accepted
/// here rather than serialized away, matching the collaborator's own
/// toggle semantics where every response is authoritative at the moment it
/// is produced.
///
/// Returns `Ok(None)` if the post was dropped by a feed reload while the
/// request was in flight; the server-side vote still happened, but there
/// is no local post left to patch.
pub async fn react(
    api: &ApiClient,
    store: &mut FeedStore,
    post_id: &str,
    kind: ReactionKind,
) -> Result<Option<ReactionUpdate>, ReactError> {
    if !store.contains(post_id) {
        return Err(ReactError::UnknownPost(post_id.to_string()));
    }

    let response = api.react(post_id, kind).await?;
    let update = ReactionUpdate {
        likes: response.likes,
        dislikes: response.dislikes,
        viewer_vote: ViewerVote::from_wire(response.user_vote),
    };

    if store.apply_reaction(post_id, update.likes, update.dislikes, update.viewer_vote) {
        tracing::debug!(
            post_id,
            likes = update.likes,
            dislikes = update.dislikes,
            "Reaction reconciled"
        );
        Ok(Some(update))
    } else {
        Ok(None)
    }
}
