//! Directory walking.
//!
//! Reads a whole directory tree into a [`TreeNode`] and encodes it.
//! Every call starts from scratch; nothing is cached between calls.

use crate::error::{Result, TreeError};
use crate::node::{TreeNode, Utf8Policy};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::debug;
use walkdir::WalkDir;

/// Options for tree serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// How file bytes are turned into JSON strings.
    pub utf8: Utf8Policy,

    /// Indent the JSON output.
    pub pretty: bool,
}

/// Walks `root` and returns the tree of everything below it.
///
/// The root itself is not an entry; only its children are. Symbolic
/// links are not followed while walking, but a link's target is read
/// like any other file, so a link to a directory fails the read.
///
/// Any error aborts the walk and the partial tree is dropped.
pub fn build_tree(root: &Path) -> Result<TreeNode> {
    let start = Instant::now();

    let meta = fs::metadata(root).map_err(|e| TreeError::io(root, e))?;
    if !meta.is_dir() {
        return Err(TreeError::io(
            root,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let mut tree = TreeNode::directory();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let segments = path_segments(root, path)?;

        let stored = if entry.file_type().is_dir() {
            tree.ensure_dir(&segments).is_some()
        } else {
            let content = fs::read(path).map_err(|e| TreeError::io(path, e))?;
            tree.insert_file(&segments, content)
        };

        if !stored {
            return Err(TreeError::io(
                path,
                io::Error::other("entry collides with a file of the same name"),
            ));
        }
    }

    debug!(
        "Read {} files in {} directories from {} in {:?}",
        tree.file_count(),
        tree.dir_count(),
        root.display(),
        start.elapsed()
    );

    Ok(tree)
}

/// Walks `root` and encodes the result as a JSON object.
///
/// # Example
///
/// ```no_run
/// use logtree_core::{serialize_dir, SerializeOptions};
/// use std::path::Path;
///
/// let json = serialize_dir(Path::new("/var/log"), SerializeOptions::default()).unwrap();
/// println!("{}", String::from_utf8_lossy(&json));
/// ```
pub fn serialize_dir(root: &Path, options: SerializeOptions) -> Result<Vec<u8>> {
    let tree = build_tree(root)?;
    if options.pretty {
        tree.to_json_pretty(options.utf8)
    } else {
        tree.to_json(options.utf8)
    }
}

/// Splits the part of `path` below `root` into names.
fn path_segments(root: &Path, path: &Path) -> Result<Vec<String>> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| TreeError::io(path, io::Error::other(e)))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect())
}
