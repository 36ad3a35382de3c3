//! Append-only audit stores.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use super::summary::{AuditContext, AuditRecord, SendSummary};
use crate::error::AuditError;

/// Destination for audit records. Implementations only ever append.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Document store reached over HTTP: one `POST` per record.
#[derive(Debug, Clone)]
pub struct HttpAuditStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
    timeout: Duration,
}

impl HttpAuditStore {
    /// Create a store appending to `{base_url}/{collection}`.
    ///
    /// Each write is bounded by `timeout`; a stalled store surfaces as
    /// [`AuditError::Unreachable`].
    pub fn new(
        client: Client,
        base_url: &str,
        collection: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AuditError> {
        let mut endpoint =
            Url::parse(base_url).map_err(|e| AuditError::InvalidUrl(format!("{base_url}: {e}")))?;

        endpoint
            .path_segments_mut()
            .map_err(|_| AuditError::InvalidUrl(base_url.to_string()))?
            .pop_if_empty()
            .push(collection);

        Ok(Self {
            client,
            endpoint,
            token,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AuditStore for HttpAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(record);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            endpoint = %self.endpoint,
            total = record.total,
            batches = record.batches,
            "audit_record_stored"
        );

        Ok(())
    }
}

/// Writes records to the log only. Used when no document store is configured.
#[derive(Debug, Clone, Default)]
pub struct LogAuditStore;

#[async_trait]
impl AuditStore for LogAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        info!(
            date = %record.date,
            from = %record.from.email,
            used_template = record.used_template,
            subject = ?record.subject,
            total = record.total,
            batches = record.batches,
            failed_batches = record.results.iter().filter(|r| !r.ok).count(),
            "audit_record_logged"
        );
        Ok(())
    }
}

/// Build the audit record for `summary` and append it to `store`.
pub async fn persist(
    store: &dyn AuditStore,
    summary: &SendSummary,
    context: &AuditContext,
) -> Result<AuditRecord, AuditError> {
    let record = AuditRecord::new(summary, context, chrono::Utc::now());

    if let Err(e) = store.append(&record).await {
        warn!(error = %e, total = record.total, "audit_persist_failed");
        return Err(e);
    }

    Ok(record)
}
