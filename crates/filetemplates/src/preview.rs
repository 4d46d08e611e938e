//! Preview availability

use crate::storage::NodeInfo;

/// Answers whether a rendered preview exists (or can be produced) for a file
pub trait PreviewProvider: Send + Sync {
    fn is_available(&self, file: &NodeInfo) -> bool;
}

/// Provider that never has previews
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreviews;

impl PreviewProvider for NoPreviews {
    fn is_available(&self, _file: &NodeInfo) -> bool {
        false
    }
}

/// Preview support decided by mimetype.
///
/// Patterns are either exact mimetypes (`text/plain`) or a whole top-level
/// type (`image/*`).
#[derive(Debug, Clone)]
pub struct MimePreviewProvider {
    enabled: bool,
    patterns: Vec<String>,
    max_file_size: Option<u64>,
}

impl MimePreviewProvider {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            patterns: patterns.into_iter().map(Into::into).collect(),
            max_file_size: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Files larger than `bytes` get no preview
    pub fn max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.max_file_size = bytes;
        self
    }

    fn matches(&self, mimetype: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(top_level) => mimetype
                .split_once('/')
                .is_some_and(|(ty, _)| ty == top_level),
            None => pattern == mimetype,
        })
    }
}

impl PreviewProvider for MimePreviewProvider {
    fn is_available(&self, file: &NodeInfo) -> bool {
        if !self.enabled || !file.is_file() {
            return false;
        }
        if self.max_file_size.is_some_and(|max| file.size > max) {
            return false;
        }
        self.matches(&file.mimetype)
    }
}
