//! Send summaries and the audit records derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::Batch;
use crate::dispatch::BatchOutcome;
use crate::message::EmailAddress;

/// Aggregate result of one invocation, returned to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSummary {
    /// Every recipient that was attempted, successful or not
    pub total_recipients: usize,
    pub batches: usize,
    pub results: Vec<BatchOutcome>,
}

impl SendSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.batches - self.succeeded()
    }
}

/// Fold per-batch outcomes into a summary.
pub fn summarize(batches: &[Batch<'_>], outcomes: Vec<BatchOutcome>) -> SendSummary {
    SendSummary {
        total_recipients: batches.iter().map(Batch::len).sum(),
        batches: outcomes.len(),
        results: outcomes,
    }
}

/// Invocation metadata recorded next to the summary.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub from: EmailAddress,
    pub used_template: bool,
    pub subject: Option<String>,
    pub category: String,
}

/// Write-once document describing one bulk send.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Calendar day (UTC), `YYYY-MM-DD`
    pub date: String,
    pub from: EmailAddress,
    pub used_template: bool,
    pub subject: Option<String>,
    pub category: String,
    pub total: usize,
    pub batches: usize,
    pub results: Vec<BatchOutcome>,
}

impl AuditRecord {
    pub fn new(summary: &SendSummary, context: &AuditContext, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            date: now.format("%Y-%m-%d").to_string(),
            from: context.from.clone(),
            used_template: context.used_template,
            subject: context.subject.clone(),
            category: context.category.clone(),
            total: summary.total_recipients,
            batches: summary.batches,
            results: summary.results.clone(),
        }
    }
}
