//! Integration tests for the comment panel: lazy reveal, cached threads,
//! validated submit, and count reconciliation through the full `App`.

use murmur::app::{App, RenderInstruction};
use murmur::comments::CommentError;
use murmur::config::Config;
use murmur::error::ValidationError;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_app(server: &MockServer) -> (App, mpsc::UnboundedReceiver<RenderInstruction>) {
    let config = Config {
        server_url: server.uri(),
        timeout_secs: 2,
        ..Config::default()
    };
    App::new(&config).unwrap()
}

fn drain(rx: &mut mpsc::UnboundedReceiver<RenderInstruction>) -> Vec<RenderInstruction> {
    let mut out = Vec::new();
    while let Ok(i) = rx.try_recv() {
        out.push(i);
    }
    out
}

async fn mount_feed_with_post_five(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "5",
            "username": "alice",
            "content": "hello",
            "created_at": "2024-03-01T12:00:00Z",
            "likes_count": 0,
            "dislikes_count": 0,
            "comments_count": 2
        }])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_reveal_twice_issues_one_fetch() {
    let server = MockServer::start().await;
    mount_feed_with_post_five(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/posts/5/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"username": "bob", "content": "first", "createdAt": "2024-03-01T10:00:00Z"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (mut app, mut rx) = test_app(&server).await;
    app.reload_feed().await;
    drain(&mut rx);

    app.reveal_comments("5").await.unwrap();
    app.reveal_comments("5").await.unwrap();

    // Both reveals draw the thread; only the first fetched it.
    let instructions = drain(&mut rx);
    assert_eq!(
        instructions,
        vec![
            RenderInstruction::CommentsRevealed {
                post_id: "5".to_string(),
                comments: 1
            },
            RenderInstruction::CommentsRevealed {
                post_id: "5".to_string(),
                comments: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_failed_reveal_is_soft_and_retries() {
    let server = MockServer::start().await;
    mount_feed_with_post_five(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/posts/5/comments"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts/5/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let (mut app, _rx) = test_app(&server).await;
    app.reload_feed().await;

    assert!(app.reveal_comments("5").await.is_err());
    // The failure left the thread unloaded; the next reveal fetches again.
    app.reveal_comments("5").await.unwrap();
    assert!(app.comments.thread("5").unwrap().loaded);
}

#[tokio::test]
async fn test_submit_scenario_count_and_local_append() {
    let server = MockServer::start().await;
    mount_feed_with_post_five(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts/5/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"username": "bob", "content": "first", "createdAt": "2024-03-01T10:00:00Z"},
        ])))
        .expect(1) // submit never re-fetches the thread
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/posts/5/comments"))
        .and(body_json(serde_json::json!({"content": "nice post"})))
        .respond_with(ResponseTemplate::new(201).set_body_string("7"))
        .mount(&server)
        .await;

    let (mut app, mut rx) = test_app(&server).await;
    app.login("carol", &SecretString::from("pw")).await.unwrap();
    app.reveal_comments("5").await.unwrap();
    drain(&mut rx);

    let count = app.submit_comment("5", "nice post").await.unwrap();
    assert_eq!(count, 7);

    // The post's count reflects the response, the cached thread gained the
    // submitted comment attributed to the signed-in user.
    assert_eq!(app.feed.get("5").unwrap().comment_count, 7);
    let thread = app.comments.thread("5").unwrap();
    assert_eq!(thread.comments.len(), 2);
    assert_eq!(&*thread.comments[1].author, "carol");
    assert_eq!(&*thread.comments[1].content, "nice post");

    assert_eq!(
        drain(&mut rx),
        vec![RenderInstruction::CommentSubmitted {
            post_id: "5".to_string(),
            comment_count: 7,
            appended: true,
        }]
    );
}

#[tokio::test]
async fn test_whitespace_comment_sends_nothing_and_changes_nothing() {
    let server = MockServer::start().await;
    mount_feed_with_post_five(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/posts/5/comments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (mut app, mut rx) = test_app(&server).await;
    app.reload_feed().await;
    drain(&mut rx);

    let err = app.submit_comment("5", "   ").await.unwrap_err();
    assert!(matches!(
        err,
        CommentError::Validation(ValidationError::EmptyComment)
    ));
    assert_eq!(app.feed.get("5").unwrap().comment_count, 2);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_comment_failure_does_not_touch_reaction_state() {
    // Errors stay local to the operation that caused them: a failed comment
    // submit leaves the post's reaction fields exactly as they were.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "5",
            "username": "alice",
            "content": "hello",
            "created_at": "2024-03-01T12:00:00Z",
            "likes_count": 4,
            "dislikes_count": 1,
            "comments_count": 2,
            "user_vote": 1
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/posts/5/comments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (mut app, _rx) = test_app(&server).await;
    app.reload_feed().await;

    assert!(app.submit_comment("5", "doomed").await.is_err());

    let post = app.feed.get("5").unwrap();
    assert_eq!(post.likes, 4);
    assert_eq!(post.dislikes, 1);
    assert_eq!(post.comment_count, 2);
}
