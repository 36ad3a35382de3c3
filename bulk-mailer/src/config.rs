//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup into [`Config`]. The pipeline never
//! touches the environment itself; it receives the narrower settings objects
//! built here ([`TransportSettings`], [`SenderDefaults`], [`DispatchSettings`]).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::dispatch::{DispatchSettings, TransportSettings};
use crate::error::BulkSendError;
use crate::message::SenderDefaults;

/// Default SendGrid v3 API base URL.
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

/// Default `List-Unsubscribe` header attached to every bulk message.
pub const DEFAULT_LIST_UNSUBSCRIBE: &str =
    "<mailto:unsubscribe@yourdomain.com>, <https://yourdomain.com/unsubscribe>";

/// Provider limit on personalizations per request.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default bound on one audit write.
pub const DEFAULT_AUDIT_TIMEOUT_MS: u64 = 10_000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// SendGrid API key; sends are refused while this is unset
    pub sendgrid_api_key: Option<String>,

    /// SendGrid API base URL (overridable for testing)
    pub sendgrid_api_url: String,

    /// Default sender email, used when a request carries no `from.email`
    pub from_email: Option<String>,

    /// Default sender display name
    pub from_name: String,

    /// Maximum recipients per provider call
    pub batch_size: usize,

    /// Maximum number of provider calls in flight per invocation
    pub dispatch_concurrency: usize,

    /// Per-call HTTP timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Ceiling for the whole dispatch phase of one invocation, in milliseconds
    pub invocation_timeout_ms: u64,

    /// Value of the `List-Unsubscribe` header on outbound messages
    pub list_unsubscribe: String,

    // =========================================================================
    // Audit Store
    // =========================================================================

    /// Base URL of the audit document store; records are only logged when unset
    pub audit_store_url: Option<String>,

    /// Bearer token for the audit document store
    pub audit_store_token: Option<String>,

    /// Collection that audit documents are appended to
    pub audit_collection: String,

    /// Timeout for one audit write in milliseconds
    pub audit_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_var("PORT", 8080),

            sendgrid_api_key: non_empty_var("SENDGRID_API_KEY"),

            sendgrid_api_url: non_empty_var("SENDGRID_API_URL")
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),

            from_email: non_empty_var("FROM_EMAIL"),

            from_name: non_empty_var("FROM_NAME").unwrap_or_else(|| "Your App".to_string()),

            batch_size: parse_positive("BULK_BATCH_SIZE", DEFAULT_BATCH_SIZE),

            dispatch_concurrency: parse_positive("DISPATCH_CONCURRENCY", 4),

            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", 30_000),

            invocation_timeout_ms: parse_var("INVOCATION_TIMEOUT_MS", 300_000),

            list_unsubscribe: non_empty_var("LIST_UNSUBSCRIBE")
                .unwrap_or_else(|| DEFAULT_LIST_UNSUBSCRIBE.to_string()),

            audit_store_url: non_empty_var("AUDIT_STORE_URL"),

            audit_store_token: non_empty_var("AUDIT_STORE_TOKEN"),

            audit_collection: non_empty_var("AUDIT_COLLECTION")
                .unwrap_or_else(|| "bulkEmailLogs".to_string()),

            audit_timeout_ms: parse_var("AUDIT_TIMEOUT_MS", DEFAULT_AUDIT_TIMEOUT_MS),
        }
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }

    /// Transport settings, or a configuration error when the API key is missing.
    pub fn transport_settings(&self) -> Result<TransportSettings, BulkSendError> {
        let api_key = self.sendgrid_api_key.clone().ok_or_else(|| {
            BulkSendError::Configuration("Secrets not set: SENDGRID_API_KEY".to_string())
        })?;

        Ok(TransportSettings {
            api_key,
            api_url: self.sendgrid_api_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }

    pub fn sender_defaults(&self) -> SenderDefaults {
        SenderDefaults {
            email: self.from_email.clone(),
            name: self.from_name.clone(),
            list_unsubscribe: self.list_unsubscribe.clone(),
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            batch_size: self.batch_size,
            concurrency: self.dispatch_concurrency,
            invocation_timeout: Duration::from_millis(self.invocation_timeout_ms),
        }
    }
}

/// Read a variable, treating an empty or whitespace-only value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or unparseable.
fn parse_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    let Some(raw) = non_empty_var(name) else {
        return default;
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Like [`parse_var`], but zero is also rejected.
fn parse_positive(name: &str, default: usize) -> usize {
    match parse_var(name, default) {
        0 => {
            warn!(env_var = name, "Value must be positive, using default");
            default
        }
        n => n,
    }
}
