use crate::api::{ApiClient, ApiError};
use crate::categories::{CategoryFilter, FilterError};
use crate::comments::{CommentError, CommentPanel, RevealOutcome};
use crate::config::Config;
use crate::error::ValidationError;
use crate::feed::{
    self, FeedScope, FeedStore, LoadOutcome, NewPost, Post, ReactError, ReactionKind, ViewerVote,
};
use crate::session::{SessionError, SessionGate};
use secrecy::SecretString;
use tokio::sync::mpsc;

/// Author label for locally appended comments when the session was restored
/// from a cookie and no login happened in this process.
const UNKNOWN_AUTHOR: &str = "me";

// ============================================================================
// Render Instructions
// ============================================================================

/// One instruction for the rendering collaborator.
///
/// The core never formats markup; it describes what changed and the
/// renderer pulls the corresponding snapshot (`App::feed`, `App::comments`,
/// `App::filter`) to draw it. Instructions are deliberately scoped: a
/// created post yields exactly one `PostInserted`, not a whole-feed redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    /// The session gate changed state; show or hide the feed surface.
    SessionChanged { authenticated: bool },
    /// The category list finished loading.
    CategoriesLoaded { count: usize },
    /// The active filter changed; highlight exactly the selected category.
    FilterChanged { selected: Option<String> },
    /// A reload replaced the whole collection; redraw the feed.
    FeedReplaced { posts: usize },
    /// A created post was prepended; draw just that post at the head.
    PostInserted { post_id: String },
    /// A post's reaction fields were reconciled; redraw its controls.
    ReactionChanged {
        post_id: String,
        likes: u32,
        dislikes: u32,
        viewer_vote: ViewerVote,
    },
    /// A comment thread became visible; draw its comments.
    CommentsRevealed { post_id: String, comments: usize },
    /// A comment was accepted; redraw the count and, if `appended`, the
    /// thread's new tail comment.
    CommentSubmitted {
        post_id: String,
        comment_count: u32,
        appended: bool,
    },
    /// A feed or category load failed. `retryable` drives the retry
    /// affordance next to the failed surface.
    LoadFailed {
        context: &'static str,
        message: String,
        retryable: bool,
    },
}

// ============================================================================
// Application Context
// ============================================================================

/// Central application state.
///
/// Owns the HTTP client (and with it the session cookie), every component
/// of the reconciliation core, and the sending half of the render channel.
/// All state mutation happens through the operation methods below, from one
/// event-processing context; the renderer only ever reads.
pub struct App {
    api: ApiClient,
    pub session: SessionGate,
    pub feed: FeedStore,
    pub comments: CommentPanel,
    pub filter: CategoryFilter,
    render_tx: mpsc::UnboundedSender<RenderInstruction>,
}

impl App {
    /// Builds the app context and the receiving half of the render channel.
    pub fn new(
        config: &Config,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RenderInstruction>), ApiError> {
        let api = ApiClient::new(&config.server_url, config.timeout_secs)?;
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let app = Self {
            api,
            session: SessionGate::new(),
            feed: FeedStore::new(),
            comments: CommentPanel::new(),
            filter: CategoryFilter::new(),
            render_tx,
        };
        Ok((app, render_rx))
    }

    fn emit(&self, instruction: RenderInstruction) {
        if self.render_tx.send(instruction).is_err() {
            tracing::warn!("Render channel closed, dropping instruction");
        }
    }

    /// A 401/403 from any feed operation means the cookie died server-side;
    /// the session gate must follow it down.
    fn note_auth_failure(&mut self, error: &ApiError) {
        if error.is_auth() && self.session.is_authenticated() {
            self.session.force_logout();
            self.emit(RenderInstruction::SessionChanged {
                authenticated: false,
            });
        }
    }

    fn report_load_failure(&mut self, context: &'static str, error: &ApiError) {
        self.emit(RenderInstruction::LoadFailed {
            context,
            message: error.to_string(),
            retryable: error.is_retryable(),
        });
    }

    // ------------------------------------------------------------------
    // Session operations
    // ------------------------------------------------------------------

    /// Checks the session and, when authenticated, brings up the feed:
    /// category list plus a whole-feed load. Returns the gate's verdict.
    ///
    /// Unauthenticated is not an error here; the feed simply stays down
    /// until a login succeeds.
    pub async fn init(&mut self) -> bool {
        let authenticated = self.session.check_status(&self.api).await;
        self.emit(RenderInstruction::SessionChanged { authenticated });

        if authenticated {
            self.load_categories().await;
            self.reload_feed().await;
        }
        authenticated
    }

    pub async fn login(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> Result<(), SessionError> {
        self.session.login(&self.api, username, password).await?;
        self.emit(RenderInstruction::SessionChanged {
            authenticated: true,
        });
        self.load_categories().await;
        self.reload_feed().await;
        Ok(())
    }

    pub async fn register(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> Result<(), SessionError> {
        self.session.register(&self.api, username, password).await
    }

    pub async fn logout(&mut self) -> Result<(), SessionError> {
        self.session.logout(&self.api).await?;
        self.emit(RenderInstruction::SessionChanged {
            authenticated: false,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Feed operations
    // ------------------------------------------------------------------

    /// Loads (or retries) the category list. Failure is surfaced with a
    /// retry affordance and leaves the filter usable for "all".
    pub async fn load_categories(&mut self) {
        match self.filter.load(&self.api).await {
            Ok(count) => self.emit(RenderInstruction::CategoriesLoaded { count }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load categories");
                self.note_auth_failure(&e);
                self.report_load_failure("categories", &e);
            }
        }
    }

    /// Re-queries whatever scope the viewer is looking at, whole feed or
    /// the active category. This is the retry affordance for failed loads.
    pub async fn reload_feed(&mut self) {
        let scope = self.filter.current_scope();
        let token = self.feed.begin_reload(&scope);
        let result = match &scope {
            FeedScope::All => self.api.fetch_posts().await,
            FeedScope::Category(id) => self.api.fetch_posts_by_category(id).await,
        };
        match self
            .feed
            .complete_reload(token, result.map(|wire| wire.into_iter().map(Post::from).collect()))
        {
            Ok(LoadOutcome::Applied { posts }) => {
                self.emit(RenderInstruction::FeedReplaced { posts });
            }
            Ok(LoadOutcome::Stale) => {}
            Err(e) => {
                tracing::warn!(error = %e, %scope, "Feed reload failed");
                self.note_auth_failure(&e);
                self.report_load_failure("feed", &e);
            }
        }
    }

    /// Selects a category and reloads the feed scoped to it.
    pub async fn select_category(&mut self, category_id: &str) -> Result<(), FilterError> {
        let result = self
            .filter
            .select_category(&self.api, &mut self.feed, category_id)
            .await;
        match result {
            Ok(LoadOutcome::Applied { posts }) => {
                self.emit(RenderInstruction::FilterChanged {
                    selected: Some(category_id.to_string()),
                });
                self.emit(RenderInstruction::FeedReplaced { posts });
                Ok(())
            }
            Ok(LoadOutcome::Stale) => Ok(()),
            Err(FilterError::Api(e)) => {
                self.note_auth_failure(&e);
                self.report_load_failure("feed", &e);
                Err(FilterError::Api(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Clears the filter and reloads the whole feed.
    pub async fn select_all(&mut self) -> Result<(), ApiError> {
        match self.filter.select_all(&self.api, &mut self.feed).await {
            Ok(LoadOutcome::Applied { posts }) => {
                self.emit(RenderInstruction::FilterChanged { selected: None });
                self.emit(RenderInstruction::FeedReplaced { posts });
                Ok(())
            }
            Ok(LoadOutcome::Stale) => Ok(()),
            Err(e) => {
                self.note_auth_failure(&e);
                self.report_load_failure("feed", &e);
                Err(e)
            }
        }
    }

    /// Validates and creates a post, prepending it on success.
    ///
    /// Exactly one render instruction is emitted for the new post; the rest
    /// of the feed is untouched.
    pub async fn create_post(&mut self, new_post: NewPost) -> Result<String, PostError> {
        if new_post.content.trim().is_empty() {
            return Err(ValidationError::EmptyPostContent.into());
        }
        if new_post.categories.is_empty() {
            return Err(ValidationError::NoCategorySelected.into());
        }

        let created = match self.api.create_post(&new_post).await {
            Ok(wire) => Post::from(wire),
            Err(e) => {
                self.note_auth_failure(&e);
                return Err(e.into());
            }
        };
        let post_id = created.id.clone();
        self.feed.insert_created(created);
        self.emit(RenderInstruction::PostInserted {
            post_id: post_id.clone(),
        });
        Ok(post_id)
    }

    /// Sends a reaction and reconciles the post with the confirmed counts.
    pub async fn react(&mut self, post_id: &str, kind: ReactionKind) -> Result<(), ReactError> {
        match feed::react(&self.api, &mut self.feed, post_id, kind).await {
            Ok(Some(update)) => {
                self.emit(RenderInstruction::ReactionChanged {
                    post_id: post_id.to_string(),
                    likes: update.likes,
                    dislikes: update.dislikes,
                    viewer_vote: update.viewer_vote,
                });
                Ok(())
            }
            Ok(None) => Ok(()), // post left the feed mid-flight; nothing to draw
            Err(ReactError::Api(e)) => {
                self.note_auth_failure(&e);
                Err(ReactError::Api(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Reveals a post's comment thread, fetching it on first reveal.
    pub async fn reveal_comments(&mut self, post_id: &str) -> Result<(), ApiError> {
        match self.comments.reveal(&self.api, post_id).await {
            Ok(RevealOutcome::Loaded { comments }) => {
                self.emit(RenderInstruction::CommentsRevealed {
                    post_id: post_id.to_string(),
                    comments,
                });
                Ok(())
            }
            Ok(RevealOutcome::AlreadyLoaded) => {
                // Cached thread; the renderer re-shows it without a fetch.
                let comments = self
                    .comments
                    .thread(post_id)
                    .map_or(0, |t| t.comments.len());
                self.emit(RenderInstruction::CommentsRevealed {
                    post_id: post_id.to_string(),
                    comments,
                });
                Ok(())
            }
            Err(e) => {
                self.note_auth_failure(&e);
                Err(e)
            }
        }
    }

    /// Submits a comment on a post, attributed to the signed-in user.
    pub async fn submit_comment(
        &mut self,
        post_id: &str,
        content: &str,
    ) -> Result<u32, CommentError> {
        let author = self
            .session
            .username()
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();
        let thread_was_loaded = self
            .comments
            .thread(post_id)
            .is_some_and(|t| t.loaded);

        match self
            .comments
            .submit(&self.api, &mut self.feed, post_id, &author, content)
            .await
        {
            Ok(comment_count) => {
                self.emit(RenderInstruction::CommentSubmitted {
                    post_id: post_id.to_string(),
                    comment_count,
                    appended: thread_was_loaded,
                });
                Ok(comment_count)
            }
            Err(CommentError::Api(e)) => {
                self.note_auth_failure(&e);
                Err(CommentError::Api(e))
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure to compose or create a post.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    /// Empty content or no category; nothing was sent to the server.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The create request failed; the feed is unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Config {
        Config {
            server_url: server.uri(),
            timeout_secs: 2,
            ..Config::default()
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RenderInstruction>) -> Vec<RenderInstruction> {
        let mut out = Vec::new();
        while let Ok(i) = rx.try_recv() {
            out.push(i);
        }
        out
    }

    fn feed_bodies() -> (serde_json::Value, serde_json::Value) {
        let posts = serde_json::json!([{
            "id": "p1",
            "username": "alice",
            "content": "hello",
            "created_at": "2024-03-01T12:00:00Z",
            "likes_count": 0,
            "dislikes_count": 0,
            "comments_count": 0
        }]);
        let categories = serde_json::json!([{"id": "tech", "name": "Technology"}]);
        (posts, categories)
    }

    #[tokio::test]
    async fn test_init_unauthenticated_keeps_feed_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/check-auth"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        // Feed endpoints must not be touched while the gate is closed.
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (mut app, mut rx) = App::new(&test_config(&server)).unwrap();
        assert!(!app.init().await);
        assert_eq!(
            drain(&mut rx),
            vec![RenderInstruction::SessionChanged {
                authenticated: false
            }]
        );
        assert!(app.feed.is_empty());
    }

    #[tokio::test]
    async fn test_init_authenticated_loads_categories_and_feed() {
        let server = MockServer::start().await;
        let (posts, categories) = feed_bodies();
        Mock::given(method("GET"))
            .and(path("/api/check-auth"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(posts))
            .mount(&server)
            .await;

        let (mut app, mut rx) = App::new(&test_config(&server)).unwrap();
        assert!(app.init().await);

        let instructions = drain(&mut rx);
        assert_eq!(
            instructions,
            vec![
                RenderInstruction::SessionChanged {
                    authenticated: true
                },
                RenderInstruction::CategoriesLoaded { count: 1 },
                RenderInstruction::FeedReplaced { posts: 1 },
            ]
        );
        assert_eq!(app.feed.len(), 1);
    }

    #[tokio::test]
    async fn test_feed_401_drops_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (mut app, mut rx) = App::new(&test_config(&server)).unwrap();
        app.login("alice", &SecretString::from("pw")).await.unwrap();

        // The 401 on the very first scoped load flipped the gate back down.
        assert!(!app.session.is_authenticated());
        let instructions = drain(&mut rx);
        assert!(instructions.contains(&RenderInstruction::SessionChanged {
            authenticated: false
        }));
    }

    #[tokio::test]
    async fn test_create_post_validation_blocks_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (mut app, mut rx) = App::new(&test_config(&server)).unwrap();

        let err = app.create_post(NewPost::default()).await.unwrap_err();
        assert!(matches!(
            err,
            PostError::Validation(ValidationError::EmptyPostContent)
        ));

        let err = app
            .create_post(NewPost {
                content: "hello".to_string(),
                ..NewPost::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PostError::Validation(ValidationError::NoCategorySelected)
        ));

        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_create_post_prepends_and_emits_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/posts/create"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "new",
                "username": "alice",
                "content": "fresh",
                "created_at": "2020-01-01T00:00:00Z",
                "categories": ["tech"]
            })))
            .mount(&server)
            .await;

        let (mut app, mut rx) = App::new(&test_config(&server)).unwrap();
        let post_id = app
            .create_post(NewPost {
                content: "fresh".to_string(),
                categories: vec!["tech".to_string()],
                image: None,
            })
            .await
            .unwrap();

        assert_eq!(post_id, "new");
        assert_eq!(app.feed.posts()[0].id, "new");
        assert_eq!(
            drain(&mut rx),
            vec![RenderInstruction::PostInserted {
                post_id: "new".to_string()
            }]
        );
    }
}
