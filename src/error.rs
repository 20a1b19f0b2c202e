use thiserror::Error;

/// Client-side validation failures.
///
/// These block the triggering request entirely: nothing is sent to the
/// network, and the message is surfaced inline next to the control that
/// caused it. The messages double as display text for the rendering
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Post content is empty after trimming.
    #[error("Post content cannot be empty")]
    EmptyPostContent,

    /// No category was selected while composing a post.
    #[error("Please select at least one category")]
    NoCategorySelected,

    /// Comment content is empty after trimming.
    #[error("Comment cannot be empty")]
    EmptyComment,

    /// A category filter was requested for an id the server never listed.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Login or registration was attempted with a blank username or password.
    #[error("Username and password are required")]
    EmptyCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_display_ready() {
        assert_eq!(
            ValidationError::EmptyPostContent.to_string(),
            "Post content cannot be empty"
        );
        assert_eq!(
            ValidationError::UnknownCategory("tech".to_string()).to_string(),
            "Unknown category: tech"
        );
    }
}
