//! In-memory storage backend for tests and development
//!
//! Holds a flat map of absolute paths to nodes. Users are created with
//! [`MemoryStorage::add_user`], which materialises `/<user>/files`.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;

use super::{FOLDER_MIMETYPE, FileStorage, NodeInfo, NodeType, etag_for, mimetype_for, parent_of};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    content: Option<Vec<u8>>,
    mimetype: String,
    mtime: OffsetDateTime,
    etag: String,
}

impl Entry {
    fn info(&self, path: &str) -> NodeInfo {
        let (node_type, size) = match &self.content {
            Some(content) => (NodeType::File, content.len() as u64),
            None => (NodeType::Folder, 0),
        };
        NodeInfo {
            path: path.to_string(),
            id: self.id,
            etag: self.etag.clone(),
            mtime: self.mtime,
            mimetype: self.mimetype.clone(),
            size,
            node_type,
        }
    }
}

#[derive(Debug, Default)]
struct Tree {
    entries: BTreeMap<String, Entry>,
    denied: HashSet<String>,
    next_id: u64,
    unavailable: bool,
}

impl Tree {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, path: &str) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Backend("Storage unavailable".into()));
        }
        if self.denied.contains(path) {
            return Err(StorageError::AccessDenied(path.to_string()));
        }
        Ok(())
    }

    fn lookup(&self, path: &str) -> Result<&Entry, StorageError> {
        self.check(path)?;
        self.entries
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn require_folder(&self, path: &str) -> Result<(), StorageError> {
        match self.lookup(path)?.content {
            None => Ok(()),
            Some(_) => Err(StorageError::NotAFolder(path.to_string())),
        }
    }

    fn mkdir_all(&mut self, path: &str) -> Result<(), StorageError> {
        if path == "/" {
            return Ok(());
        }
        match self.entries.get(path) {
            Some(entry) if entry.content.is_none() => return Ok(()),
            Some(_) => return Err(StorageError::NotAFolder(path.to_string())),
            None => {}
        }
        if let Some(parent) = parent_of(path) {
            self.mkdir_all(parent)?;
        }
        let mtime = OffsetDateTime::now_utc();
        let id = self.next_id();
        self.entries.insert(
            path.to_string(),
            Entry {
                id,
                content: None,
                mimetype: FOLDER_MIMETYPE.to_string(),
                mtime,
                etag: etag_for(path, &id.to_le_bytes(), mtime),
            },
        );
        Ok(())
    }

    fn write(&mut self, path: &str, content: Vec<u8>, mimetype: String) -> NodeInfo {
        let mtime = OffsetDateTime::now_utc();
        let id = match self.entries.get(path) {
            Some(existing) => existing.id,
            None => self.next_id(),
        };
        let entry = Entry {
            id,
            etag: etag_for(path, &content, mtime),
            content: Some(content),
            mimetype,
            mtime,
        };
        let info = entry.info(path);
        self.entries.insert(path.to_string(), entry);
        info
    }
}

/// In-memory [`FileStorage`] implementation
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tree: Mutex<Tree>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> Result<MutexGuard<'_, Tree>, StorageError> {
        self.tree
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))
    }

    /// Create a user and its root folder, returning the root path
    pub fn add_user(&self, user_id: &str) -> Result<String, StorageError> {
        let root = format!("/{}/files", user_id);
        self.tree()?.mkdir_all(&root)?;
        Ok(root)
    }

    /// Create a folder and any missing parents
    pub fn mkdir(&self, path: &str) -> Result<(), StorageError> {
        self.tree()?.mkdir_all(path)
    }

    /// Create or replace a file, guessing its mimetype from the name
    pub fn put_file(&self, path: &str, content: &[u8]) -> Result<NodeInfo, StorageError> {
        let mimetype = mimetype_for(path);
        self.put_file_with_mimetype(path, content, &mimetype)
    }

    /// Create or replace a file with an explicit mimetype
    pub fn put_file_with_mimetype(
        &self,
        path: &str,
        content: &[u8],
        mimetype: &str,
    ) -> Result<NodeInfo, StorageError> {
        let mut tree = self.tree()?;
        if let Some(parent) = parent_of(path) {
            tree.mkdir_all(parent)?;
        }
        if matches!(tree.entries.get(path), Some(e) if e.content.is_none()) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        Ok(tree.write(path, content.to_vec(), mimetype.to_string()))
    }

    /// Content of a file
    pub fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let tree = self.tree()?;
        tree.lookup(path)?
            .content
            .clone()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))
    }

    /// Make every access to `path` fail with [`StorageError::AccessDenied`]
    pub fn deny(&self, path: &str) -> Result<(), StorageError> {
        self.tree()?.denied.insert(path.to_string());
        Ok(())
    }

    /// Simulate an outage: every operation fails with a backend error
    pub fn set_unavailable(&self, unavailable: bool) -> Result<(), StorageError> {
        self.tree()?.unavailable = unavailable;
        Ok(())
    }

    /// Number of files (folders excluded)
    pub fn file_count(&self) -> usize {
        self.tree
            .lock()
            .map(|tree| tree.entries.values().filter(|e| e.content.is_some()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn user_root(&self, user_id: &str) -> Result<String, StorageError> {
        let root = format!("/{}/files", user_id);
        let tree = self.tree()?;
        tree.require_folder(&root)?;
        Ok(root)
    }

    async fn get(&self, path: &str) -> Result<NodeInfo, StorageError> {
        let tree = self.tree()?;
        Ok(tree.lookup(path)?.info(path))
    }

    async fn list(&self, path: &str) -> Result<Vec<NodeInfo>, StorageError> {
        let tree = self.tree()?;
        tree.require_folder(path)?;
        Ok(tree
            .entries
            .iter()
            .filter(|(child, _)| parent_of(child) == Some(path))
            .map(|(child, entry)| entry.info(child))
            .collect())
    }

    async fn new_file(&self, path: &str) -> Result<NodeInfo, StorageError> {
        let mut tree = self.tree()?;
        tree.check(path)?;
        let parent = parent_of(path).ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        tree.require_folder(parent)?;
        if tree.entries.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        Ok(tree.write(path, Vec::new(), mimetype_for(path)))
    }

    async fn copy(&self, source: &str, dest: &str) -> Result<NodeInfo, StorageError> {
        let mut tree = self.tree()?;
        let source_entry = tree.lookup(source)?;
        let content = source_entry
            .content
            .clone()
            .ok_or_else(|| StorageError::Backend(format!("Cannot copy folder {}", source)))?;
        let mimetype = source_entry.mimetype.clone();

        tree.check(dest)?;
        let parent = parent_of(dest).ok_or_else(|| StorageError::InvalidPath(dest.to_string()))?;
        tree.require_folder(parent)?;
        if matches!(tree.entries.get(dest), Some(e) if e.content.is_none()) {
            return Err(StorageError::AlreadyExists(dest.to_string()));
        }
        Ok(tree.write(dest, content, mimetype))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::new();
        let root = storage.add_user("alice").unwrap();
        assert_eq!(root, "/alice/files");
        assert_eq!(storage.user_root("alice").await.unwrap(), root);

        let created = storage.new_file("/alice/files/a.txt").await.unwrap();
        assert_eq!(created.size, 0);
        assert_eq!(created.mimetype, "text/plain");
        assert_eq!(created.name(), "a.txt");
        assert!(created.is_file());

        let fetched = storage.get("/alice/files/a.txt").await.unwrap();
        assert_eq!(fetched, created);

        let listing = storage.list("/alice/files").await.unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let storage = MemoryStorage::new();
        let result = storage.user_root("nobody").await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_new_file_is_create_if_absent() {
        let storage = MemoryStorage::new();
        storage.add_user("alice").unwrap();
        storage.put_file("/alice/files/a.txt", b"keep me").unwrap();

        let result = storage.new_file("/alice/files/a.txt").await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.read("/alice/files/a.txt").unwrap(), b"keep me");

        let missing_parent = storage.new_file("/alice/files/nope/a.txt").await;
        assert!(matches!(missing_parent, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_copy_replaces_content_and_keeps_id() {
        let storage = MemoryStorage::new();
        storage.add_user("alice").unwrap();
        storage
            .put_file("/alice/files/Templates/letter.odt", b"template body")
            .unwrap();
        let target = storage.new_file("/alice/files/new.odt").await.unwrap();

        let copied = storage
            .copy("/alice/files/Templates/letter.odt", "/alice/files/new.odt")
            .await
            .unwrap();

        assert_eq!(copied.id, target.id);
        assert_eq!(copied.size, 13);
        assert_ne!(copied.etag, target.etag);
        assert_eq!(storage.read("/alice/files/new.odt").unwrap(), b"template body");
    }

    #[tokio::test]
    async fn test_listing_is_direct_children_only() {
        let storage = MemoryStorage::new();
        storage.add_user("alice").unwrap();
        storage.put_file("/alice/files/Templates/a.txt", b"a").unwrap();
        storage.put_file("/alice/files/Templates/sub/b.txt", b"b").unwrap();

        let names: Vec<_> = storage
            .list("/alice/files/Templates")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name().to_string())
            .collect();

        assert_eq!(names, vec!["a.txt", "sub"]);
    }

    #[tokio::test]
    async fn test_denied_and_unavailable() {
        let storage = MemoryStorage::new();
        storage.add_user("alice").unwrap();
        storage.mkdir("/alice/files/Templates").unwrap();
        storage.deny("/alice/files/Templates").unwrap();

        assert!(matches!(
            storage.get("/alice/files/Templates").await,
            Err(StorageError::AccessDenied(_))
        ));

        storage.set_unavailable(true).unwrap();
        assert!(matches!(
            storage.get("/alice/files").await,
            Err(StorageError::Backend(_))
        ));
    }
}
