//! HTTP server.
//!
//! One route: `GET /` returns the configured directory as JSON. The tree
//! is re-read on every request; nothing is cached.

use crate::error::ServerError;
use crate::handlers::{self, AppState};
use axum::routing::get;
use axum::Router;
use logtree_core::SerializeOptions;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server configuration. Fixed once the server is built.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,

    /// Directory served at `/`.
    pub root: PathBuf,

    /// How the tree is encoded.
    pub options: SerializeOptions,
}

impl ServerConfig {
    pub fn new(addr: SocketAddr, root: impl Into<PathBuf>) -> Self {
        Self {
            addr,
            root: root.into(),
            options: SerializeOptions::default(),
        }
    }
}

/// Builds the router for `config`.
pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        root: Arc::new(config.root.clone()),
        options: config.options,
    };

    Router::new()
        .route("/", get(handlers::tree))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves a directory tree over HTTP.
pub struct LogTreeServer {
    config: ServerConfig,
}

impl LogTreeServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves until the process is killed.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes, then lets in-flight requests
    /// finish.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(
            "Serving {} on http://{}",
            self.config.root.display(),
            listener.local_addr()?
        );

        axum::serve(listener, router(&self.config))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
