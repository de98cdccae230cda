//! Error types for tree serialization.
//!
//! Two things can go wrong: the walk fails to read something, or the
//! finished tree can't be encoded. Either one aborts the whole call.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that can fail during serialization.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Things that can go wrong when turning a directory into JSON.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The root is missing, a directory couldn't be listed, or a file
    /// couldn't be read.
    #[error("failed to read '{path}': {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The walk succeeded but the tree couldn't be encoded.
    #[error("failed to encode tree: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TreeError {
    /// Creates a filesystem error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised while reading the tree.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, Self::Filesystem { .. })
    }
}

impl From<walkdir::Error> for TreeError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
        Self::Filesystem { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path() {
        let err = TreeError::io(
            "/var/log/missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_filesystem());
        assert!(err.to_string().contains("/var/log/missing"));
    }

    #[test]
    fn test_walkdir_error_becomes_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = walkdir::WalkDir::new(&missing)
            .into_iter()
            .next()
            .unwrap()
            .unwrap_err();

        match TreeError::from(err) {
            TreeError::Filesystem { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
