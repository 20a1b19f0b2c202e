//! Client-side reconciliation core for a self-hosted social feed server.
//!
//! The server owns the truth: posts, reaction counts, comment threads, and
//! the session itself. This crate keeps a local view of all of it
//! consistent across partial updates (token-guarded feed reloads,
//! confirm-only reaction reconciliation, lazy comment threads, a
//! fail-closed session gate) and emits render instructions for whatever
//! front end sits on top. The bundled binary is a plain-text terminal
//! renderer over the same core.

pub mod api;
pub mod app;
pub mod categories;
pub mod comments;
pub mod config;
pub mod error;
pub mod feed;
pub mod session;

pub use app::{App, RenderInstruction};
pub use config::Config;
