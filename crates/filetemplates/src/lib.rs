//! # filetemplates
//!
//! Lets apps register the file types they can create from templates, lists
//! the templates a user keeps in their `Templates` folder for every
//! registered type, and creates new files from those templates.
//!
//! ## Core Concepts
//!
//! - **Template groups** are `(app, label, extension, mimetypes)` tuples,
//!   registered once at startup into a [`TemplateRegistry`]
//! - **Storage** is an external collaborator behind [`FileStorage`]
//! - **Previews** are answered by a [`PreviewProvider`]
//! - The [`TemplateService`] is built per request for the current user
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use filetemplates::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mut registry = TemplateRegistry::new();
//! registry.register("text", vec!["text/plain".into()], "New text file", "txt");
//! let registry = Arc::new(registry);
//!
//! let storage = Arc::new(MemoryStorage::new());
//! storage.add_user("alice")?;
//!
//! let service = TemplateService::new(
//!     storage,
//!     Arc::new(NoPreviews),
//!     registry,
//!     Some("alice".to_string()),
//! );
//!
//! for group in service.list_mimetypes().await? {
//!     println!("{}: {} templates", group.label, group.templates.len());
//! }
//! let created = service.create_from_template("/new.txt", None).await?;
//! println!("Created {}", created.filename);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod format;
pub mod preview;
pub mod registry;
pub mod service;
pub mod storage;

pub use error::{Result, StorageError, TemplateError};
pub use format::{TemplateFileInfo, format_file};
pub use preview::{MimePreviewProvider, NoPreviews, PreviewProvider};
pub use registry::{TemplateGroup, TemplateRegistry};
pub use service::{DEFAULT_TEMPLATE_FOLDER, TemplateGroupListing, TemplateService};
pub use storage::{FileStorage, NodeInfo, NodeType, Probe, UserFolder};

#[cfg(feature = "fs")]
pub use storage::LocalStorage;
#[cfg(feature = "memory")]
pub use storage::MemoryStorage;

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
