//! Local filesystem backend
//!
//! Maps `/<user>/files/<rel>` onto `<base>/<user>/files/<rel>`.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tracing::debug;

use super::{FOLDER_MIMETYPE, FileStorage, NodeInfo, NodeType, etag_for, mimetype_for, normalize_relative};
use crate::error::StorageError;

/// [`FileStorage`] backed by a directory on disk
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage rooted at `base_path`
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Disk location of a storage path
    fn real_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let segments = normalize_relative(path)?;
        let mut real = self.base_path.clone();
        real.extend(segments);
        Ok(real)
    }

    /// Create `/<user>/files` on disk if a write lands in it first
    async fn ensure_user_root(&self, path: &str) -> Result<(), StorageError> {
        let segments = normalize_relative(path)?;
        if let [user, "files", _, ..] = segments.as_slice() {
            let root = format!("/{}/files", user);
            fs::create_dir_all(self.real_path(&root)?)
                .await
                .map_err(|e| StorageError::from_io(e, &root))?;
        }
        Ok(())
    }

    async fn node_info(&self, path: &str, real: &Path) -> Result<NodeInfo, StorageError> {
        let metadata = fs::metadata(real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;

        let mtime = metadata
            .modified()
            .map(OffsetDateTime::from)
            .map_err(|e| StorageError::from_io(e, path))?;

        let (node_type, size, mimetype) = if metadata.is_dir() {
            (NodeType::Folder, 0, FOLDER_MIMETYPE.to_string())
        } else {
            (NodeType::File, metadata.len(), mimetype_for(path))
        };

        Ok(NodeInfo {
            path: path.to_string(),
            id: file_id(path),
            etag: etag_for(path, &size.to_le_bytes(), mtime),
            mtime,
            mimetype,
            size,
            node_type,
        })
    }
}

/// Stable numeric id derived from the storage path
fn file_id(path: &str) -> u64 {
    let digest = Sha256::digest(path.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    // Keep ids positive for clients that read them as signed integers
    u64::from_be_bytes(bytes) >> 1
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn user_root(&self, user_id: &str) -> Result<String, StorageError> {
        if user_id.is_empty() || user_id.contains('/') || user_id == "." || user_id == ".." {
            return Err(StorageError::InvalidPath(user_id.to_string()));
        }
        // Created lazily by the first write, so reads leave the disk untouched
        Ok(format!("/{}/files", user_id))
    }

    async fn get(&self, path: &str) -> Result<NodeInfo, StorageError> {
        let real = self.real_path(path)?;
        self.node_info(path, &real).await
    }

    async fn list(&self, path: &str) -> Result<Vec<NodeInfo>, StorageError> {
        let real = self.real_path(path)?;
        let folder = self.node_info(path, &real).await?;
        if !folder.is_folder() {
            return Err(StorageError::NotAFolder(path.to_string()));
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::from_io(e, path))?
        {
            // Names that are not valid UTF-8 cannot be addressed by path strings
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();

        let parent = path.trim_end_matches('/');
        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            let child = format!("{}/{}", parent, name);
            match self.node_info(&child, &real.join(&name)).await {
                Ok(node) => nodes.push(node),
                // Dangling symlink, or removed since read_dir
                Err(StorageError::NotFound(_)) => debug!("Skipping unreadable entry {}", child),
                Err(e) => return Err(e),
            }
        }
        Ok(nodes)
    }

    async fn new_file(&self, path: &str) -> Result<NodeInfo, StorageError> {
        let real = self.real_path(path)?;
        self.ensure_user_root(path).await?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        self.node_info(path, &real).await
    }

    async fn copy(&self, source: &str, dest: &str) -> Result<NodeInfo, StorageError> {
        let real_source = self.real_path(source)?;
        let real_dest = self.real_path(dest)?;

        if self.node_info(source, &real_source).await?.is_folder() {
            return Err(StorageError::Backend(format!("Cannot copy folder {}", source)));
        }
        if let Ok(existing) = self.node_info(dest, &real_dest).await {
            if existing.is_folder() {
                return Err(StorageError::AlreadyExists(dest.to_string()));
            }
        }

        fs::copy(&real_source, &real_dest)
            .await
            .map_err(|e| StorageError::from_io(e, dest))?;
        self.node_info(dest, &real_dest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_workflow() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let root = storage.user_root("alice").await.unwrap();
        assert_eq!(root, "/alice/files");
        assert!(!dir.path().join("alice").exists());

        let created = storage.new_file("/alice/files/new.txt").await.unwrap();
        assert!(dir.path().join("alice/files").is_dir());
        assert_eq!(created.size, 0);
        assert_eq!(created.mimetype, "text/plain");
        assert!(created.is_file());

        let again = storage.new_file("/alice/files/new.txt").await;
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_local_listing_and_copy() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.user_root("alice").await.unwrap();

        let templates = dir.path().join("alice/files/Templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join("b.txt"), b"second").unwrap();
        std::fs::write(templates.join("a.txt"), b"first").unwrap();

        let listing = storage.list("/alice/files/Templates").await.unwrap();
        let names: Vec<_> = listing.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(listing[0].path, "/alice/files/Templates/a.txt");
        assert_eq!(listing[0].size, 5);

        storage.new_file("/alice/files/copy.txt").await.unwrap();
        let copied = storage
            .copy("/alice/files/Templates/a.txt", "/alice/files/copy.txt")
            .await
            .unwrap();
        assert_eq!(copied.size, 5);
        assert_eq!(
            std::fs::read(dir.path().join("alice/files/copy.txt")).unwrap(),
            b"first"
        );
    }

    #[tokio::test]
    async fn test_local_rejects_traversal() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(matches!(
            storage.get("/alice/files/../../etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.user_root("..").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_local_missing_path() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.user_root("alice").await.unwrap();

        assert!(matches!(
            storage.get("/alice/files/Templates").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.list("/alice/files/missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_new_file_needs_existing_parent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let result = storage.new_file("/alice/files/missing/new.txt").await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!dir.path().join("alice/files/missing").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listing_skips_dangling_symlinks() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let templates = dir.path().join("alice/files/Templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join("a.txt"), b"first").unwrap();
        std::os::unix::fs::symlink(templates.join("gone"), templates.join("zz-broken.txt")).unwrap();

        let listing = storage.list("/alice/files/Templates").await.unwrap();

        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name(), "a.txt");
    }
}
