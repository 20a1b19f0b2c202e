use crate::api::ApiError;
use crate::feed::types::{Post, ViewerVote};

// ============================================================================
// Load Scopes and Tokens
// ============================================================================

/// The query scope of a feed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// The whole feed (`/api/posts`)
    All,
    /// One category (`/api/categories/{id}/posts`)
    Category(String),
}

impl std::fmt::Display for FeedScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedScope::All => f.write_str("all"),
            FeedScope::Category(id) => write!(f, "category {id}"),
        }
    }
}

/// Token for one in-flight feed load.
///
/// Issued by [`FeedStore::begin_reload`] and handed back to
/// [`FeedStore::complete_reload`]. A token is stale once any newer load has
/// been issued, regardless of scope: a whole-feed reload supersedes a
/// pending category reload and vice versa, so both scopes share one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

/// What `complete_reload` did with a response.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was the latest issued load and replaced the collection.
    Applied { posts: usize },
    /// A newer load was issued while this one was in flight; the response
    /// was discarded and the collection is untouched.
    Stale,
}

// ============================================================================
// Feed Store
// ============================================================================

/// In-memory ordered collection of posts.
///
/// Posts are kept in the exact order the server delivered them (descending
/// creation time); the store never re-sorts. Reloads go through a
/// begin/complete pair so that responses arriving out of order can be
/// discarded: only the most recently issued load may replace the
/// collection. There is deliberately no such token for per-post reaction
/// patches; concurrent reactions on the same post are last-completion-wins
/// (see `feed::reactions`).
#[derive(Default)]
pub struct FeedStore {
    posts: Vec<Post>,
    /// Monotonic counter; the latest issued load owns the collection.
    load_generation: u64,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts in server delivery order, newest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.get(post_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Registers a new feed load and returns its token.
    ///
    /// Issuing a new load makes every earlier token stale, which is what
    /// guarantees last-request-wins when responses complete out of order.
    pub fn begin_reload(&mut self, scope: &FeedScope) -> LoadToken {
        self.load_generation += 1;
        tracing::debug!(generation = self.load_generation, %scope, "Feed load issued");
        LoadToken(self.load_generation)
    }

    /// Applies the result of a feed load.
    ///
    /// A stale token discards the result unseen, success or failure: a
    /// superseded load must neither clobber the collection nor surface an
    /// error for a query nobody is waiting on. A current token with a
    /// failed result leaves the previous collection untouched and
    /// propagates the error so the caller can offer a retry.
    pub fn complete_reload(
        &mut self,
        token: LoadToken,
        result: Result<Vec<Post>, ApiError>,
    ) -> Result<LoadOutcome, ApiError> {
        if token.0 != self.load_generation {
            tracing::debug!(
                token = token.0,
                current = self.load_generation,
                "Discarding superseded feed load"
            );
            return Ok(LoadOutcome::Stale);
        }

        let posts = result?;
        let count = posts.len();
        self.posts = posts;
        tracing::info!(posts = count, "Feed replaced");
        Ok(LoadOutcome::Applied { posts: count })
    }

    /// Prepends a freshly created post.
    ///
    /// The new post goes to index 0 unconditionally; its timestamp is not
    /// compared against existing entries. The feed is not reloaded.
    pub fn insert_created(&mut self, post: Post) {
        tracing::debug!(post_id = %post.id, "Inserting created post at head");
        self.posts.insert(0, post);
    }

    /// Replaces a post's reaction fields with server-confirmed values.
    ///
    /// The triple is replaced wholesale, never incrementally adjusted, so a
    /// single response can legally flip a prior dislike to none+like.
    /// Returns false (with a warning) if the post has been dropped by a
    /// reload since the reaction was sent.
    pub fn apply_reaction(
        &mut self,
        post_id: &str,
        likes: u32,
        dislikes: u32,
        viewer_vote: ViewerVote,
    ) -> bool {
        match self.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) => {
                post.likes = likes;
                post.dislikes = dislikes;
                post.viewer_vote = viewer_vote;
                true
            }
            None => {
                tracing::warn!(post_id, "Reaction response for a post no longer in the feed");
                false
            }
        }
    }

    /// Sets a post's total comment count to a server-confirmed value.
    ///
    /// Returns false (with a warning) if the post is no longer present.
    pub fn set_comment_count(&mut self, post_id: &str, comment_count: u32) -> bool {
        match self.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) => {
                post.comment_count = comment_count;
                true
            }
            None => {
                tracing::warn!(post_id, "Comment count for a post no longer in the feed");
                false
            }
        }
    }
}
