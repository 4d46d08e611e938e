//! Storage abstraction for user files
//!
//! The template service never touches bytes itself; it talks to a
//! [`FileStorage`] backend through absolute paths of the form
//! `/<user>/files/<relative path>` and to a user-scoped [`UserFolder`] view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::error::StorageError;

pub mod folder;
#[cfg(feature = "fs")]
pub mod local;
#[cfg(feature = "memory")]
pub mod memory;

pub use folder::{Probe, UserFolder};
#[cfg(feature = "fs")]
pub use local::LocalStorage;
#[cfg(feature = "memory")]
pub use memory::MemoryStorage;

/// Mimetype reported for folders
pub const FOLDER_MIMETYPE: &str = "httpd/unix-directory";

/// Kind of a storage node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "dir")]
    Folder,
}

/// Metadata snapshot of a file or folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Absolute path, e.g. `/alice/files/Templates/letter.odt`
    pub path: String,
    pub id: u64,
    pub etag: String,
    pub mtime: OffsetDateTime,
    pub mimetype: String,
    pub size: u64,
    pub node_type: NodeType,
}

impl NodeInfo {
    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }
}

/// Backend holding every user's files
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Absolute path of the user's root folder
    async fn user_root(&self, user_id: &str) -> Result<String, StorageError>;

    /// Resolve an absolute path to a node
    async fn get(&self, path: &str) -> Result<NodeInfo, StorageError>;

    /// Direct children of a folder, in backend order
    async fn list(&self, path: &str) -> Result<Vec<NodeInfo>, StorageError>;

    /// Create an empty file.
    ///
    /// Must fail with [`StorageError::AlreadyExists`] if anything already
    /// occupies `path`; the check and the creation are one step.
    async fn new_file(&self, path: &str) -> Result<NodeInfo, StorageError>;

    /// Copy a file over `dest`, replacing whatever file is there
    async fn copy(&self, source: &str, dest: &str) -> Result<NodeInfo, StorageError>;
}

/// Opaque change tag for a content revision
pub fn etag_for(path: &str, revision: &[u8], mtime: OffsetDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(revision);
    hasher.update(mtime.unix_timestamp_nanos().to_le_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..16].to_string()
}

/// Mimetype guessed from the file name's extension
pub fn mimetype_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Split a user-relative path into clean segments.
///
/// Leading, trailing and repeated slashes and `.` are dropped; `..` is
/// rejected.
pub fn normalize_relative(path: &str) -> Result<Vec<&str>, StorageError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments)
}

/// Parent folder of an absolute path, `None` for `/`
pub fn parent_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) if trimmed.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}
