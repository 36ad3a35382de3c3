//! Mail transport: the seam between the dispatcher and the provider API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::TransportError;
use crate::message::ProviderMessage;

/// Resolved transport credentials and endpoint.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub api_key: String,
    /// Base URL, e.g. `https://api.sendgrid.com/v3`
    pub api_url: String,
    pub request_timeout: Duration,
}

/// HTTP status and body returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one provider message per call.
///
/// An `Err` means no HTTP response was obtained. Provider rejections are
/// `Ok` responses with a non-2xx status.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &ProviderMessage) -> Result<TransportResponse, TransportError>;
}

/// SendGrid v3 `mail/send` transport.
#[derive(Debug, Clone)]
pub struct SendGridTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl SendGridTransport {
    /// Create a transport over a shared HTTP client.
    pub fn new(client: Client, settings: TransportSettings) -> Self {
        Self {
            client,
            endpoint: format!("{}/mail/send", settings.api_url.trim_end_matches('/')),
            api_key: settings.api_key,
            timeout: settings.request_timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn send(&self, message: &ProviderMessage) -> Result<TransportResponse, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            recipients = message.recipient_count(),
            uses_template = message.body.is_template(),
            "sendgrid_request_starting"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(message)
            .send()
            .await?;

        let status = response.status().as_u16();
        // An unreadable body degrades to empty; the caller substitutes a generic message.
        let body = response.text().await.unwrap_or_default();

        debug!(status_code = status, body_length = body.len(), "sendgrid_request_complete");

        Ok(TransportResponse { status, body })
    }
}
