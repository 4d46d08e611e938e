//! Registry of template-capable file types
//!
//! Apps register the mimetypes they can create from templates while the
//! process boots. Registration needs `&mut TemplateRegistry`; once bootstrap
//! is done the registry is frozen behind an `Arc` and shared with every
//! [`TemplateService`](crate::TemplateService), so listing can never race
//! with registration.

use serde::{Deserialize, Serialize};

/// One creatable file kind, as registered by an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGroup {
    /// Owning application identifier
    pub app: String,

    /// Display label of the "new file" action
    pub label: String,

    /// Extension of files created for this group, without the dot
    pub extension: String,

    /// Mimetypes a template file may have to belong to this group
    pub mimetypes: Vec<String>,
}

impl TemplateGroup {
    pub fn new(
        app_id: impl Into<String>,
        mimetypes: Vec<String>,
        action_label: impl Into<String>,
        file_extension: impl Into<String>,
    ) -> Self {
        Self {
            app: app_id.into(),
            label: action_label.into(),
            extension: file_extension.into(),
            mimetypes,
        }
    }

    /// Exact, case-sensitive membership test
    pub fn accepts(&self, mimetype: &str) -> bool {
        self.mimetypes.iter().any(|m| m == mimetype)
    }
}

/// Ordered, append-only list of template groups
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    groups: Vec<TemplateGroup>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Register template support for an app.
    ///
    /// Duplicates are kept; nothing is validated.
    pub fn register(
        &mut self,
        app_id: impl Into<String>,
        mimetypes: Vec<String>,
        action_label: impl Into<String>,
        file_extension: impl Into<String>,
    ) -> &mut Self {
        self.register_group(TemplateGroup::new(
            app_id,
            mimetypes,
            action_label,
            file_extension,
        ))
    }

    /// Append an already built group
    pub fn register_group(&mut self, group: TemplateGroup) -> &mut Self {
        tracing::debug!(
            app = %group.app,
            extension = %group.extension,
            "Registered template support"
        );
        self.groups.push(group);
        self
    }

    /// Groups in registration order
    pub fn groups(&self) -> &[TemplateGroup] {
        &self.groups
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<TemplateGroup> for TemplateRegistry {
    fn from_iter<I: IntoIterator<Item = TemplateGroup>>(iter: I) -> Self {
        let mut registry = TemplateRegistry::new();
        for group in iter {
            registry.register_group(group);
        }
        registry
    }
}
