//! The feed store and its reconciliation operations.
//!
//! The store holds the ordered post collection exactly as the server
//! delivered it; reloads are token-guarded so a superseded query can never
//! clobber a newer one, and reaction/comment-count patches touch single
//! posts without re-fetching anything.

mod reactions;
mod store;
mod types;

pub use reactions::{react, ReactError, ReactionUpdate};
pub use store::{FeedScope, FeedStore, LoadOutcome, LoadToken};
pub use types::{NewPost, Post, PostImage, ReactionKind, ViewerVote};
