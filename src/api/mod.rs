//! HTTP collaborator client.
//!
//! Everything the core knows about the remote server lives here: the
//! endpoint set, the wire shapes, and the error taxonomy for failed calls.
//! The stores never see `reqwest` types or wire field names.

mod client;
mod types;

pub use client::{ApiClient, ApiError};
pub use types::{Category, ReactionResponse, WireComment, WirePost};
