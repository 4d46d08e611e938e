//! Error types for the filetemplates library
//!
//! Storage collaborators report [`StorageError`]; the template service
//! reports [`TemplateError`], which deliberately hides storage causes for
//! creation failures.

use thiserror::Error;

/// Errors reported by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a folder: {0}")]
    NotAFolder(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No user logged in")]
    NoUser,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether this error means "the thing is not there for this user",
    /// as opposed to the backend misbehaving
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_)
                | StorageError::AccessDenied(_)
                | StorageError::NotAFolder(_)
                | StorageError::NoUser
        )
    }
}

#[cfg(feature = "fs")]
impl StorageError {
    /// Map an io error for `path` onto the storage taxonomy
    pub(crate) fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::AccessDenied(path.to_string()),
            std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
            _ => StorageError::Backend(format!("{}: {}", path, err)),
        }
    }
}

/// Errors returned by the template service
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("No user logged in")]
    NoUser,

    #[error("File already exists: {0}")]
    FileExists(String),

    /// Opaque on purpose; the cause is logged, never returned
    #[error("Failed to create file from template")]
    CreationFailed,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for template service operations
pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_classification() {
        assert!(StorageError::NotFound("/a".into()).is_absence());
        assert!(StorageError::AccessDenied("/a".into()).is_absence());
        assert!(StorageError::NoUser.is_absence());
        assert!(!StorageError::Backend("down".into()).is_absence());
        assert!(!StorageError::InvalidPath("/a".into()).is_absence());
    }

    #[test]
    fn test_creation_failed_hides_cause() {
        assert_eq!(
            TemplateError::CreationFailed.to_string(),
            "Failed to create file from template"
        );
    }
}
