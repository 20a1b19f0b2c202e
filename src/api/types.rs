use chrono::{DateTime, Utc};
use serde::Deserialize;

// ============================================================================
// Wire Types
// ============================================================================
//
// Shapes exactly as the remote collaborator delivers them. Conversion into
// the domain types held by the stores happens at the module boundary
// (`feed::Post::from`, `comments::Comment::from`), so nothing outside `api`
// depends on wire field names.

/// A post as delivered by `/api/posts`, `/api/categories/{id}/posts`,
/// and `/api/posts/create`.
///
/// Count fields default to zero because the create response may omit them
/// for a brand-new post.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePost {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub username: String,
    pub content: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub dislikes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    /// `1` = like, `-1` = dislike, `0` or absent = no vote.
    #[serde(default)]
    pub user_vote: i8,
}

/// Authoritative reaction state returned by `/api/posts/{id}/react`.
///
/// The whole triple replaces the post's local reaction fields. `userVote`
/// uses the same encoding as [`WirePost::user_vote`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReactionResponse {
    pub likes: u32,
    pub dislikes: u32,
    #[serde(rename = "userVote", default)]
    pub user_vote: i8,
}

/// A comment as delivered by `GET /api/posts/{id}/comments`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireComment {
    pub username: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A category as delivered by `/api/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Body shape of a non-2xx response. Anything unparsable falls back to a
/// fixed generic message.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_deserializes_with_all_fields() {
        let json = r#"{
            "id": "p1",
            "user_id": "u1",
            "username": "alice",
            "content": "hello",
            "image_path": "abc.png",
            "created_at": "2024-03-01T12:00:00Z",
            "categories": ["tech", "news"],
            "likes_count": 3,
            "dislikes_count": 1,
            "comments_count": 2,
            "user_vote": -1
        }"#;
        let post: WirePost = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.categories, vec!["tech", "news"]);
        assert_eq!(post.user_vote, -1);
    }

    #[test]
    fn test_post_count_fields_default_to_zero() {
        // A freshly created post may omit count fields entirely.
        let json = r#"{
            "id": "p2",
            "username": "bob",
            "content": "first",
            "created_at": "2024-03-01T12:00:00Z"
        }"#;
        let post: WirePost = serde_json::from_str(json).unwrap();
        assert_eq!(post.likes_count, 0);
        assert_eq!(post.dislikes_count, 0);
        assert_eq!(post.comments_count, 0);
        assert_eq!(post.user_vote, 0);
        assert!(post.image_path.is_none());
        assert!(post.categories.is_empty());
    }

    #[test]
    fn test_reaction_response_renamed_field() {
        let json = r#"{"likes": 5, "dislikes": 2, "userVote": 1}"#;
        let resp: ReactionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.likes, 5);
        assert_eq!(resp.user_vote, 1);
    }

    #[test]
    fn test_comment_renamed_field() {
        let json = r#"{"username": "carol", "content": "nice", "createdAt": "2024-03-01T12:00:00Z"}"#;
        let comment: WireComment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.username, "carol");
    }
}
