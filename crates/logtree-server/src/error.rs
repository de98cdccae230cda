//! Server and request error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logtree_core::TreeError;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::warn;

/// Body sent with every failed tree request.
pub const FAILURE_BODY: &str = "Failed to generate JSON data";

/// Errors that stop the server itself.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors local to a single request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("serializer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        warn!("Failed to generate JSON data: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response()
    }
}
