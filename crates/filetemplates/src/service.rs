//! Template listing and file creation for the current user

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{Result, StorageError, TemplateError};
use crate::format::{TemplateFileInfo, format_file};
use crate::preview::PreviewProvider;
use crate::registry::{TemplateGroup, TemplateRegistry};
use crate::storage::{FileStorage, NodeInfo, Probe, UserFolder};

/// Folder scanned for templates, relative to the user's root
pub const DEFAULT_TEMPLATE_FOLDER: &str = "Templates";

/// A registered group together with the user's matching templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGroupListing {
    pub app: String,
    pub label: String,
    pub extension: String,
    pub mimetypes: Vec<String>,
    pub templates: Vec<TemplateFileInfo>,
}

impl TemplateGroupListing {
    fn new(group: &TemplateGroup, templates: Vec<TemplateFileInfo>) -> Self {
        Self {
            app: group.app.clone(),
            label: group.label.clone(),
            extension: group.extension.clone(),
            mimetypes: group.mimetypes.clone(),
            templates,
        }
    }
}

/// Request-scoped template service, bound to one (possibly absent) user
#[derive(Clone)]
pub struct TemplateService {
    storage: Arc<dyn FileStorage>,
    preview: Arc<dyn PreviewProvider>,
    registry: Arc<TemplateRegistry>,
    user_id: Option<String>,
    template_folder: String,
}

impl TemplateService {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        preview: Arc<dyn PreviewProvider>,
        registry: Arc<TemplateRegistry>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            storage,
            preview,
            registry,
            user_id,
            template_folder: DEFAULT_TEMPLATE_FOLDER.to_string(),
        }
    }

    /// Scan another folder instead of `Templates`
    pub fn with_template_folder(mut self, path: impl Into<String>) -> Self {
        self.template_folder = path.into();
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    async fn user_folder(&self) -> std::result::Result<UserFolder, StorageError> {
        UserFolder::open(self.storage.clone(), self.user_id.as_deref()).await
    }

    /// Children of the templates folder, or `None` if the user has none
    /// they can read
    async fn template_candidates(&self) -> Result<Option<(UserFolder, Vec<NodeInfo>)>> {
        let folder = match self.user_folder().await {
            Ok(folder) => folder,
            Err(e) if e.is_absence() => {
                debug!("No user folder, listing without templates: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match folder.list(&self.template_folder).await {
            Ok(nodes) => Ok(Some((folder, nodes))),
            Err(e) if e.is_absence() => {
                debug!("Template folder unavailable: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All registered groups, in registration order, each with the files of
    /// the templates folder whose mimetype the group accepts
    pub async fn list_mimetypes(&self) -> Result<Vec<TemplateGroupListing>> {
        let candidates = self.template_candidates().await?;

        self.registry
            .iter()
            .map(|group| -> Result<TemplateGroupListing> {
                let templates = match &candidates {
                    Some((folder, nodes)) => nodes
                        .iter()
                        .filter(|node| node.is_file() && group.accepts(&node.mimetype))
                        .map(|node| format_file(folder, self.preview.as_ref(), node))
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                    None => Vec::new(),
                };
                Ok(TemplateGroupListing::new(group, templates))
            })
            .collect()
    }

    /// Create `file_path`, empty or as a copy of `template_path`.
    ///
    /// Never overwrites: an occupied target yields
    /// [`TemplateError::FileExists`]. Storage failures are logged and
    /// reported as [`TemplateError::CreationFailed`].
    pub async fn create_from_template(
        &self,
        file_path: &str,
        template_path: Option<&str>,
    ) -> Result<TemplateFileInfo> {
        let folder = self.user_folder().await.map_err(|e| match e {
            StorageError::NoUser => TemplateError::NoUser,
            other => TemplateError::Storage(other),
        })?;

        match folder.probe(file_path).await {
            Probe::Exists(_) => {
                debug!("Refusing to create {}: file already exists", file_path);
                return Err(TemplateError::FileExists(file_path.to_string()));
            }
            Probe::NotFound => {}
            Probe::Failed(e) => return Err(self.creation_failed(file_path, e)),
        }

        // Create-if-absent; someone may have won the race since the probe
        if let Err(e) = folder.new_file(file_path).await {
            return Err(match e {
                StorageError::AlreadyExists(_) => {
                    debug!("Refusing to create {}: file already exists", file_path);
                    TemplateError::FileExists(file_path.to_string())
                }
                e => self.creation_failed(file_path, e),
            });
        }

        let template_path = template_path.filter(|p| !p.is_empty());
        match self.fill_and_format(&folder, file_path, template_path).await {
            Ok(file) => {
                info!(
                    "Created {} for {} from {}",
                    file_path,
                    self.user_id.as_deref().unwrap_or_default(),
                    template_path.unwrap_or("empty file")
                );
                Ok(file)
            }
            Err(e) => Err(self.creation_failed(file_path, e)),
        }
    }

    async fn fill_and_format(
        &self,
        folder: &UserFolder,
        file_path: &str,
        template_path: Option<&str>,
    ) -> std::result::Result<TemplateFileInfo, StorageError> {
        if let Some(template) = template_path {
            folder.copy(template, file_path).await?;
        }
        let node = folder.get(file_path).await?;
        format_file(folder, self.preview.as_ref(), &node)
    }

    fn creation_failed(&self, file_path: &str, cause: StorageError) -> TemplateError {
        error!(
            user = self.user_id.as_deref().unwrap_or_default(),
            path = file_path,
            "Failed to create file from template: {}",
            cause
        );
        TemplateError::CreationFailed
    }
}

impl std::fmt::Debug for TemplateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateService")
            .field("user_id", &self.user_id)
            .field("template_folder", &self.template_folder)
            .field("groups", &self.registry.len())
            .finish()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::preview::NoPreviews;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    /// Hides `hidden` from lookups, as if another writer created it right
    /// after the existence check
    struct LateWriter {
        inner: Arc<MemoryStorage>,
        hidden: String,
    }

    #[async_trait]
    impl FileStorage for LateWriter {
        async fn user_root(&self, user_id: &str) -> std::result::Result<String, StorageError> {
            self.inner.user_root(user_id).await
        }

        async fn get(&self, path: &str) -> std::result::Result<NodeInfo, StorageError> {
            if path == self.hidden {
                return Err(StorageError::NotFound(path.to_string()));
            }
            self.inner.get(path).await
        }

        async fn list(&self, path: &str) -> std::result::Result<Vec<NodeInfo>, StorageError> {
            self.inner.list(path).await
        }

        async fn new_file(&self, path: &str) -> std::result::Result<NodeInfo, StorageError> {
            self.inner.new_file(path).await
        }

        async fn copy(
            &self,
            source: &str,
            dest: &str,
        ) -> std::result::Result<NodeInfo, StorageError> {
            self.inner.copy(source, dest).await
        }
    }

    fn service(storage: Arc<MemoryStorage>, user: Option<&str>) -> TemplateService {
        let mut registry = TemplateRegistry::new();
        registry.register("text", vec!["text/plain".into()], "Text file", "txt");
        TemplateService::new(
            storage,
            Arc::new(NoPreviews),
            Arc::new(registry),
            user.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_custom_template_folder() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_user("alice").unwrap();
        storage.put_file("/alice/files/Vorlagen/a.txt", b"a").unwrap();
        storage.put_file("/alice/files/Templates/b.txt", b"b").unwrap();

        let listing = service(storage, Some("alice"))
            .with_template_folder("Vorlagen")
            .list_mimetypes()
            .await
            .unwrap();

        assert_eq!(listing[0].templates.len(), 1);
        assert_eq!(listing[0].templates[0].filename, "/Vorlagen/a.txt");
    }

    #[tokio::test]
    async fn test_folders_are_not_templates() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_user("alice").unwrap();
        storage.mkdir("/alice/files/Templates/old.txt").unwrap();

        let listing = service(storage, Some("alice")).list_mimetypes().await.unwrap();

        assert!(listing[0].templates.is_empty());
    }

    #[tokio::test]
    async fn test_templates_path_is_a_file() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_user("alice").unwrap();
        storage.put_file("/alice/files/Templates", b"oops").unwrap();

        let listing = service(storage, Some("alice")).list_mimetypes().await.unwrap();

        assert_eq!(listing.len(), 1);
        assert!(listing[0].templates.is_empty());
    }

    #[tokio::test]
    async fn test_create_without_user() {
        let storage = Arc::new(MemoryStorage::new());

        let result = service(storage, None)
            .create_from_template("new.txt", None)
            .await;

        assert!(matches!(result, Err(TemplateError::NoUser)));
    }

    #[tokio::test]
    async fn test_empty_template_path_creates_empty_file() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_user("alice").unwrap();

        let file = service(storage.clone(), Some("alice"))
            .create_from_template("/new.txt", Some(""))
            .await
            .unwrap();

        assert_eq!(file.size, 0);
        assert!(storage.read("/alice/files/new.txt").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_is_opaque() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_user("alice").unwrap();
        storage.deny("/alice/files/locked.txt").unwrap();

        let result = service(storage.clone(), Some("alice"))
            .create_from_template("/locked.txt", None)
            .await;

        assert!(matches!(result, Err(TemplateError::CreationFailed)));
        assert_eq!(storage.file_count(), 0);
    }

    #[tokio::test]
    async fn test_losing_create_race_is_a_conflict() {
        let storage = Arc::new(MemoryStorage::new());
        storage.add_user("alice").unwrap();
        storage.put_file("/alice/files/Templates/a.txt", b"template").unwrap();
        storage.put_file("/alice/files/new.txt", b"written first").unwrap();
        let racing = Arc::new(LateWriter {
            inner: storage.clone(),
            hidden: "/alice/files/new.txt".to_string(),
        });

        let mut registry = TemplateRegistry::new();
        registry.register("text", vec!["text/plain".into()], "Text file", "txt");
        let result = TemplateService::new(
            racing,
            Arc::new(NoPreviews),
            Arc::new(registry),
            Some("alice".to_string()),
        )
        .create_from_template("/new.txt", Some("/Templates/a.txt"))
        .await;

        assert!(matches!(result, Err(TemplateError::FileExists(path)) if path == "/new.txt"));
        assert_eq!(storage.read("/alice/files/new.txt").unwrap(), b"written first");
    }
}
