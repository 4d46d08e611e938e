//! User-scoped view over a [`FileStorage`] backend

use std::sync::Arc;

use super::{FileStorage, NodeInfo, normalize_relative};
use crate::error::StorageError;

/// Outcome of checking whether a path is occupied.
///
/// Only [`Probe::NotFound`] means the path is free to be created.
#[derive(Debug)]
pub enum Probe {
    Exists(NodeInfo),
    NotFound,
    Failed(StorageError),
}

/// A user's root folder; every path it takes is relative to that root
#[derive(Clone)]
pub struct UserFolder {
    storage: Arc<dyn FileStorage>,
    root: String,
}

impl UserFolder {
    /// Resolve the root folder of `user_id`
    pub async fn open(
        storage: Arc<dyn FileStorage>,
        user_id: Option<&str>,
    ) -> Result<Self, StorageError> {
        let user_id = user_id.ok_or(StorageError::NoUser)?;
        let root = storage.user_root(user_id).await?;
        Ok(Self { storage, root })
    }

    /// Absolute path of the root folder
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Absolute path for a path relative to the root
    pub fn absolute_path(&self, relative: &str) -> Result<String, StorageError> {
        let segments = normalize_relative(relative)?;
        if segments.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(format!(
            "{}/{}",
            self.root.trim_end_matches('/'),
            segments.join("/")
        ))
    }

    /// Path of `absolute` relative to the root, with a leading slash.
    ///
    /// Fails with [`StorageError::InvalidPath`] when `absolute` is not
    /// inside this folder.
    pub fn relative_path(&self, absolute: &str) -> Result<String, StorageError> {
        let root = self.root.trim_end_matches('/');
        let rest = absolute
            .strip_prefix(root)
            .ok_or_else(|| StorageError::InvalidPath(absolute.to_string()))?;

        if rest.is_empty() {
            return Ok("/".to_string());
        }
        if !rest.starts_with('/') {
            // "/alice/files2" shares the prefix but is a sibling
            return Err(StorageError::InvalidPath(absolute.to_string()));
        }
        Ok(rest.to_string())
    }

    pub async fn get(&self, relative: &str) -> Result<NodeInfo, StorageError> {
        let path = self.absolute_path(relative)?;
        self.storage.get(&path).await
    }

    /// Check whether `relative` is occupied without treating absence as an error
    pub async fn probe(&self, relative: &str) -> Probe {
        match self.get(relative).await {
            Ok(node) => Probe::Exists(node),
            Err(StorageError::NotFound(_)) => Probe::NotFound,
            Err(e) => Probe::Failed(e),
        }
    }

    /// Direct children of the folder at `relative`
    pub async fn list(&self, relative: &str) -> Result<Vec<NodeInfo>, StorageError> {
        let folder = self.get(relative).await?;
        if !folder.is_folder() {
            return Err(StorageError::NotAFolder(folder.path));
        }
        self.storage.list(&folder.path).await
    }

    pub async fn new_file(&self, relative: &str) -> Result<NodeInfo, StorageError> {
        let path = self.absolute_path(relative)?;
        self.storage.new_file(&path).await
    }

    /// Copy `source` over `dest`, both relative to the root
    pub async fn copy(&self, source: &str, dest: &str) -> Result<NodeInfo, StorageError> {
        let source = self.get(source).await?;
        let dest = self.absolute_path(dest)?;
        self.storage.copy(&source.path, &dest).await
    }
}

impl std::fmt::Debug for UserFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserFolder").field("root", &self.root).finish()
    }
}
