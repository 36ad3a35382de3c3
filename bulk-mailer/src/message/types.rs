//! Inbound request types for the bulk send endpoint.
//!
//! Field names follow the JSON the admin front end posts (camelCase).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category applied when the caller does not supply one.
pub const DEFAULT_CATEGORY: &str = "bulk";

/// MIME type applied to attachments that do not declare one.
pub const DEFAULT_ATTACHMENT_TYPE: &str = "application/octet-stream";

/// Body of `POST /bulk-email`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendRequest {
    /// Optional sender override; each field falls back to the configured default
    #[serde(default)]
    pub from: Option<SenderOverride>,
    /// Literal subject (required unless `template_id` is set)
    #[serde(default)]
    pub subject: Option<String>,
    /// Literal HTML body
    #[serde(default)]
    pub html: Option<String>,
    /// Provider-hosted template reference
    #[serde(default)]
    pub template_id: Option<String>,
    /// Ordered recipient list
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    /// Provider analytics category
    #[serde(default = "default_category")]
    pub category: String,
    /// Attachments shared by every recipient
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl BulkSendRequest {
    /// Template id, if one was supplied and is not blank.
    pub fn template_id(&self) -> Option<&str> {
        self.template_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Caller-supplied sender identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SenderOverride {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One recipient of a bulk send.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Recipient {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Per-recipient template substitution data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Map<String, Value>>,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            vars: None,
        }
    }
}

/// Base64-encoded attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub content: String,
    pub filename: String,
    #[serde(default, rename = "type", alias = "mimeType")]
    pub mime_type: Option<String>,
}
