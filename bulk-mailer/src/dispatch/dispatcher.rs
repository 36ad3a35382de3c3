//! Batch dispatch with per-batch failure isolation.
//!
//! Every message gets exactly one provider call and exactly one
//! [`BatchOutcome`]. Calls run with bounded concurrency; results are written
//! into slots addressed by batch index, so the returned outcomes are always in
//! plan order no matter which call finishes first.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use super::transport::MailTransport;
use crate::message::ProviderMessage;

/// Fallback error detail when the provider rejects a batch with an empty body.
pub const GENERIC_PROVIDER_ERROR: &str = "SendGrid failed";

/// Error detail recorded for batches still unfinished at the deadline.
pub const DEADLINE_ERROR: &str = "cancelled: invocation deadline exceeded";

/// Dispatch limits for one invocation.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub batch_size: usize,
    /// Maximum provider calls in flight; 1 dispatches sequentially
    pub concurrency: usize,
    pub invocation_timeout: Duration,
}

/// Verdict for one batch's provider call.
///
/// `status` is the provider's HTTP status, or 0 when no response was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch: usize,
    pub count: usize,
    pub ok: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn accepted(batch: usize, count: usize, status: u16) -> Self {
        Self {
            batch,
            count,
            ok: true,
            status,
            error: None,
        }
    }

    pub fn rejected(batch: usize, count: usize, status: u16, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            GENERIC_PROVIDER_ERROR.to_string()
        } else {
            body.to_string()
        };

        Self {
            batch,
            count,
            ok: false,
            status,
            error: Some(detail),
        }
    }

    /// No HTTP response was obtained.
    pub fn failed(batch: usize, count: usize, detail: impl Into<String>) -> Self {
        Self {
            batch,
            count,
            ok: false,
            status: 0,
            error: Some(detail.into()),
        }
    }

    pub fn cancelled(batch: usize, count: usize) -> Self {
        Self::failed(batch, count, DEADLINE_ERROR)
    }
}

/// Sends batch messages through a [`MailTransport`].
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    concurrency: usize,
    deadline: Instant,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, concurrency: usize, deadline: Instant) -> Self {
        Self {
            transport,
            concurrency: concurrency.max(1),
            deadline,
        }
    }

    /// Send every message, returning one outcome per message in input order.
    ///
    /// Never fails: transport errors and provider rejections become failed
    /// outcomes. When the deadline passes, in-flight calls are dropped and the
    /// unfinished batches are recorded as cancelled.
    pub async fn send_all(&self, messages: &[ProviderMessage]) -> Vec<BatchOutcome> {
        let mut slots: Vec<Option<BatchOutcome>> = vec![None; messages.len()];

        // Collect the calls first: mapping inside the stream leaves a closure
        // over borrowed messages that makes the handler future non-`Send`.
        let calls: Vec<_> = messages
            .iter()
            .enumerate()
            .map(|(index, message)| async move { (index, self.send_one(index, message).await) })
            .collect();
        let mut in_flight = stream::iter(calls).buffer_unordered(self.concurrency);

        loop {
            match timeout_at(self.deadline, in_flight.next()).await {
                Ok(Some((index, outcome))) => slots[index] = Some(outcome),
                Ok(None) => break,
                Err(_) => {
                    let pending = slots.iter().filter(|s| s.is_none()).count();
                    warn!(pending_batches = pending, "bulk_dispatch_deadline_exceeded");
                    break;
                }
            }
        }
        // Dropping the stream cancels any call still in flight.
        drop(in_flight);

        slots
            .into_iter()
            .zip(messages)
            .enumerate()
            .map(|(index, (slot, message))| {
                slot.unwrap_or_else(|| BatchOutcome::cancelled(index, message.recipient_count()))
            })
            .collect()
    }

    async fn send_one(&self, index: usize, message: &ProviderMessage) -> BatchOutcome {
        let count = message.recipient_count();

        match self.transport.send(message).await {
            Ok(response) if response.is_success() => {
                info!(
                    batch = index,
                    recipients = count,
                    status_code = response.status,
                    "bulk_batch_sent"
                );
                BatchOutcome::accepted(index, count, response.status)
            }
            Ok(response) => {
                error!(
                    batch = index,
                    recipients = count,
                    status_code = response.status,
                    body = %response.body,
                    "bulk_batch_rejected"
                );
                BatchOutcome::rejected(index, count, response.status, &response.body)
            }
            Err(e) => {
                error!(
                    batch = index,
                    recipients = count,
                    error = %e,
                    "bulk_batch_failed"
                );
                BatchOutcome::failed(index, count, e.to_string())
            }
        }
    }
}
