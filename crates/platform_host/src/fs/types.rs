//! Virtual filesystem node types shared by the VFS store and durable storage adapters.

use serde::{Deserialize, Serialize};

use super::path::leaf_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Virtual filesystem node kind.
pub enum NodeKind {
    /// Leaf node carrying content.
    File,
    /// Container node; children are addressed by path prefix.
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A single file or directory in the virtual filesystem.
///
/// This is also the value stored by durable backends under the node's absolute path.
pub struct FileNode {
    /// Leaf name (`""` for the root).
    pub name: String,
    /// File or directory kind.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Absolute canonical path.
    pub path: String,
    /// File payload; always `None` for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Creation time in unix milliseconds.
    pub created_at: u64,
    /// Last update time in unix milliseconds.
    pub updated_at: u64,
}

impl FileNode {
    /// Builds a file node for a canonical `path`, stamped with `now` for both timestamps.
    pub fn file(path: impl Into<String>, content: impl Into<String>, now: u64) -> Self {
        let path = path.into();
        Self {
            name: leaf_name(&path).to_string(),
            kind: NodeKind::File,
            path,
            content: Some(content.into()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a directory node for a canonical `path`, stamped with `now` for both timestamps.
    pub fn directory(path: impl Into<String>, now: u64) -> Self {
        let path = path.into();
        Self {
            name: leaf_name(&path).to_string(),
            kind: NodeKind::Directory,
            path,
            content: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` for file nodes.
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Returns `true` for directory nodes.
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}
