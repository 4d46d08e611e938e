//! Projection of storage nodes for API consumers

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::preview::PreviewProvider;
use crate::storage::{NodeInfo, NodeType, UserFolder};

/// Read-only description of a template or newly created file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFileInfo {
    pub basename: String,
    pub etag: String,
    pub fileid: u64,
    /// Path relative to the user's root folder
    pub filename: String,
    #[serde(with = "time::serde::timestamp")]
    pub lastmod: OffsetDateTime,
    pub mime: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(rename = "hasPreview")]
    pub has_preview: bool,
}

/// Format `node` as seen from `folder`.
///
/// Fails when `node` does not live inside `folder`.
pub fn format_file(
    folder: &UserFolder,
    preview: &dyn PreviewProvider,
    node: &NodeInfo,
) -> Result<TemplateFileInfo, StorageError> {
    Ok(TemplateFileInfo {
        basename: node.name().to_string(),
        etag: node.etag.clone(),
        fileid: node.id,
        filename: folder.relative_path(&node.path)?,
        lastmod: node.mtime,
        mime: node.mimetype.clone(),
        size: node.size,
        node_type: node.node_type,
        has_preview: preview.is_available(node),
    })
}
