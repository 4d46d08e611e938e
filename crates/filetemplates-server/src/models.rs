//! API models for requests and responses

use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: String) -> Self {
        Self {
            data,
            message: Some(message),
        }
    }
}

/// Request to create a file, optionally from a template
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFromTemplateRequest {
    /// Target path, relative to the user's root
    pub file_path: String,

    /// Template to copy; absent or empty creates an empty file
    #[serde(default)]
    pub template_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_missing_template() {
        let request: CreateFromTemplateRequest =
            serde_json::from_str(r#"{"filePath": "/new.txt"}"#).unwrap();

        assert_eq!(request.file_path, "/new.txt");
        assert!(request.template_path.is_none());
    }

    #[test]
    fn test_response_skips_empty_message() {
        let value = serde_json::to_value(ApiResponse::new(1)).unwrap();
        assert!(value.get("message").is_none());

        let value = serde_json::to_value(ApiResponse::with_message(1, "ok".into())).unwrap();
        assert_eq!(value["message"], "ok");
    }
}
