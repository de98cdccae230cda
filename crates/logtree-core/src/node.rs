//! Tree node representation.
//!
//! A TreeNode mirrors one entry of the walked directory: either a
//! directory holding named children, or a file holding its bytes.
//! Encoding to JSON is a visit over those two cases.

use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::Result;

/// How file bytes become JSON strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Utf8Policy {
    /// Invalid sequences are replaced with U+FFFD.
    #[default]
    Lossy,
    /// Invalid sequences fail the encoding.
    Strict,
}

/// One entry of a serialized directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// A directory, keyed by child name.
    Directory(BTreeMap<String, TreeNode>),
    /// A file's full content.
    File(Vec<u8>),
}

impl Default for TreeNode {
    fn default() -> Self {
        Self::directory()
    }
}

impl TreeNode {
    /// An empty directory node.
    pub fn directory() -> Self {
        Self::Directory(BTreeMap::new())
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Returns the child called `name`, if this is a directory that has one.
    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        match self {
            Self::Directory(children) => children.get(name),
            Self::File(_) => None,
        }
    }

    /// Follows a chain of names down from this node.
    pub fn lookup<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Option<&TreeNode> {
        segments
            .into_iter()
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Makes sure a directory exists at `segments`, creating any missing
    /// intermediate directories on the way.
    ///
    /// Returns `None` if a file already sits somewhere along the chain.
    pub fn ensure_dir(&mut self, segments: &[String]) -> Option<&mut BTreeMap<String, TreeNode>> {
        let mut current = match self {
            Self::Directory(children) => children,
            Self::File(_) => return None,
        };

        for segment in segments {
            let child = current
                .entry(segment.clone())
                .or_insert_with(TreeNode::directory);
            current = match child {
                Self::Directory(children) => children,
                Self::File(_) => return None,
            };
        }

        Some(current)
    }

    /// Stores `content` as a file at `segments`. The parent chain is
    /// created as needed.
    ///
    /// Returns `false` if the path collides with an existing file.
    pub fn insert_file(&mut self, segments: &[String], content: Vec<u8>) -> bool {
        let Some((name, parents)) = segments.split_last() else {
            return false;
        };
        match self.ensure_dir(parents) {
            Some(dir) => {
                dir.insert(name.clone(), Self::File(content));
                true
            }
            None => false,
        }
    }

    /// Number of file leaves below this node.
    pub fn file_count(&self) -> usize {
        match self {
            Self::Directory(children) => children.values().map(TreeNode::file_count).sum(),
            Self::File(_) => 1,
        }
    }

    /// Number of directories below this node, not counting itself.
    pub fn dir_count(&self) -> usize {
        match self {
            Self::Directory(children) => children
                .values()
                .filter(|child| child.is_directory())
                .map(|child| 1 + child.dir_count())
                .sum(),
            Self::File(_) => 0,
        }
    }

    /// Encodes the tree as compact JSON.
    pub fn to_json(&self, policy: Utf8Policy) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.encoded(policy))?)
    }

    /// Encodes the tree as indented JSON.
    pub fn to_json_pretty(&self, policy: Utf8Policy) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.encoded(policy))?)
    }

    fn encoded(&self, policy: Utf8Policy) -> Encoded<'_> {
        Encoded { node: self, policy }
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.encoded(Utf8Policy::default()).serialize(serializer)
    }
}

/// A node paired with the policy used for its file contents.
struct Encoded<'a> {
    node: &'a TreeNode,
    policy: Utf8Policy,
}

impl Serialize for Encoded<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.node {
            TreeNode::Directory(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (name, child) in children {
                    map.serialize_entry(name, &child.encoded(self.policy))?;
                }
                map.end()
            }
            TreeNode::File(content) => match self.policy {
                Utf8Policy::Lossy => serializer.serialize_str(&String::from_utf8_lossy(content)),
                Utf8Policy::Strict => match std::str::from_utf8(content) {
                    Ok(text) => serializer.serialize_str(text),
                    Err(e) => Err(S::Error::custom(format!(
                        "file content is not valid UTF-8: {}",
                        e
                    ))),
                },
            },
        }
    }
}
