use crate::api::WirePost;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// Reaction State
// ============================================================================

/// The viewer's vote on a post. Mutually exclusive per viewer per post,
/// enforced server-side; locally this is derived state only, replaced
/// wholesale by each reaction response or feed reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerVote {
    #[default]
    None,
    Like,
    Dislike,
}

impl ViewerVote {
    /// Decodes the wire encoding: `1` like, `-1` dislike, anything else none.
    pub fn from_wire(value: i8) -> Self {
        match value {
            1 => ViewerVote::Like,
            -1 => ViewerVote::Dislike,
            _ => ViewerVote::None,
        }
    }
}

/// A reaction the viewer can send. Sending the same kind twice toggles it
/// off server-side; the client only reflects whatever the response states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

// ============================================================================
// Post
// ============================================================================

/// A single feed entry.
///
/// Owned exclusively by the [`FeedStore`](crate::feed::FeedStore); reaction
/// fields and the comment count change only through store patch operations
/// or a full reload. Text fields use `Arc<str>` so clones handed to the
/// rendering collaborator are cheap.
#[derive(Debug, Clone)]
pub struct Post {
    /// Opaque server-assigned identifier
    pub id: String,
    pub author: Arc<str>,
    pub content: Arc<str>,
    pub image_path: Option<Arc<str>>,
    pub created_at: DateTime<Utc>,
    pub categories: BTreeSet<String>,
    pub likes: u32,
    pub dislikes: u32,
    pub comment_count: u32,
    pub viewer_vote: ViewerVote,
}

impl From<WirePost> for Post {
    fn from(wire: WirePost) -> Self {
        Post {
            id: wire.id,
            author: Arc::from(wire.username),
            content: Arc::from(wire.content),
            image_path: wire.image_path.map(Arc::from),
            created_at: wire.created_at,
            categories: wire.categories.into_iter().collect(),
            likes: wire.likes_count,
            dislikes: wire.dislikes_count,
            comment_count: wire.comments_count,
            viewer_vote: ViewerVote::from_wire(wire.user_vote),
        }
    }
}

// ============================================================================
// Compose State
// ============================================================================

/// Transient compose-form state for a new post.
///
/// Multiple categories are allowed here even though browsing is
/// single-select; this is form state, not filter state. Validated by
/// `App::create_post` before any request is built.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: String,
    pub categories: Vec<String>,
    pub image: Option<PostImage>,
}

/// An image attached to a new post, uploaded as one multipart part.
#[derive(Debug, Clone)]
pub struct PostImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}
