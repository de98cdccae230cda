//! Logtree Server - a directory tree over HTTP
//!
//! This crate serves a single route: `GET /` walks the configured
//! directory and answers with the tree as JSON. Failures become a
//! plain-text `500` and never take the server down.

mod error;
mod handlers;
mod server;

pub use error::{RequestError, ServerError, FAILURE_BODY};
pub use server::{router, LogTreeServer, ServerConfig};
