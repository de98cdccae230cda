//! Logtree Core - directory trees as JSON
//!
//! This crate turns a directory into a single JSON object: directories
//! become nested objects, files become their content as strings.
//!
//! # Example
//!
//! ```no_run
//! use logtree_core::build_tree;
//! use std::path::Path;
//!
//! let tree = build_tree(Path::new("/var/log")).unwrap();
//! println!("{} files, {} directories", tree.file_count(), tree.dir_count());
//! ```

pub mod error;
pub mod node;
pub mod walk;

pub use error::{Result, TreeError};
pub use node::{TreeNode, Utf8Policy};
pub use walk::{build_tree, serialize_dir, SerializeOptions};
