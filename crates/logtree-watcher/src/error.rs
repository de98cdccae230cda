//! Error types for the change watcher.

use crate::watcher::WatcherState;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Things that can go wrong while watching a directory.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The tree couldn't be registered. The watcher never started.
    #[error("failed to watch '{path}': {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The watcher was asked to start from a state other than idle.
    #[error("watcher cannot start while {0}")]
    InvalidState(WatcherState),

    /// Observation can't continue; the watcher has stopped.
    #[error("watcher stopped: {0}")]
    Fatal(String),
}

impl WatchError {
    /// Creates a setup error with the watched root for context.
    pub fn setup(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        Self::Setup {
            path: path.into(),
            source,
        }
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup { .. })
    }
}
