//! Server configuration management

use crate::error::{ApiError, Result};
use filetemplates::{DEFAULT_TEMPLATE_FOLDER, MimePreviewProvider, TemplateGroup, TemplateRegistry};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Root of the local file storage (`<data_dir>/<user>/files`)
    pub data_dir: PathBuf,

    /// Templates folder, relative to each user's root
    pub template_folder: String,

    /// JSON file listing the template groups to register at startup
    pub template_groups_file: Option<PathBuf>,

    /// Mimetype patterns that have previews (`image/*` or exact)
    pub preview_mimetypes: Vec<String>,

    /// Files above this size never have a preview
    pub preview_max_file_size: Option<u64>,

    pub enable_previews: bool,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: match lookup("PORT") {
                Some(port) => port
                    .parse()
                    .map_err(|_| ApiError::Config("Invalid PORT value".to_string()))?,
                None => defaults.port,
            },
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            template_folder: lookup("TEMPLATE_FOLDER").unwrap_or(defaults.template_folder),
            template_groups_file: lookup("TEMPLATE_GROUPS_FILE").map(PathBuf::from),
            preview_mimetypes: lookup("PREVIEW_MIMETYPES")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.preview_mimetypes),
            preview_max_file_size: lookup("PREVIEW_MAX_FILE_SIZE")
                .map(|s| {
                    s.parse().map_err(|_| {
                        ApiError::Config("Invalid PREVIEW_MAX_FILE_SIZE value".to_string())
                    })
                })
                .transpose()?,
            enable_previews: lookup("ENABLE_PREVIEWS")
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(defaults.enable_previews),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
        })
    }

    pub fn preview_provider(&self) -> MimePreviewProvider {
        MimePreviewProvider::new(self.preview_mimetypes.iter().cloned())
            .enabled(self.enable_previews)
            .max_file_size(self.preview_max_file_size)
    }

    /// Build the template registry, from the groups file if one is set
    pub fn load_registry(&self) -> Result<TemplateRegistry> {
        let Some(path) = &self.template_groups_file else {
            return Ok(default_registry());
        };

        let raw = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let groups: Vec<TemplateGroup> = serde_json::from_str(&raw).map_err(|e| {
            ApiError::Config(format!("Invalid template groups in {}: {}", path.display(), e))
        })?;

        info!("Loaded {} template groups from {}", groups.len(), path.display());
        Ok(groups.into_iter().collect())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            template_folder: DEFAULT_TEMPLATE_FOLDER.to_string(),
            template_groups_file: None,
            preview_mimetypes: vec![
                "image/*".to_string(),
                "text/plain".to_string(),
                "text/markdown".to_string(),
                "application/pdf".to_string(),
            ],
            preview_max_file_size: None,
            enable_previews: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Groups registered when no groups file is configured
pub fn default_registry() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
        .register("text", vec!["text/plain".to_string()], "New text file", "txt")
        .register(
            "text",
            vec!["text/markdown".to_string()],
            "New markdown file",
            "md",
        );
    registry
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
