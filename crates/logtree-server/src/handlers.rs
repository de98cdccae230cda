//! Request handlers.

use crate::error::RequestError;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use logtree_core::{serialize_dir, SerializeOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Shared, read-only state handed to every request.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub root: Arc<PathBuf>,
    pub options: SerializeOptions,
}

/// `GET /`: the whole tree under the root as one JSON object.
///
/// The walk runs on the blocking pool so a slow disk only holds up
/// this request.
pub(crate) async fn tree(State(state): State<AppState>) -> Result<impl IntoResponse, RequestError> {
    let root = Arc::clone(&state.root);
    let options = state.options;

    let json = tokio::task::spawn_blocking(move || serialize_dir(&root, options)).await??;
    debug!("Serving {} bytes of JSON", json.len());

    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}
