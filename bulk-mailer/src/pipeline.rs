//! Bulk send pipeline - one invocation from validated request to summary.
//!
//! ## Flow
//!
//! ```text
//! BulkSendRequest → plan() → build() per batch → Dispatcher::send_all() → summarize() → persist()
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use crate::audit::{persist, summarize, AuditContext, AuditStore, SendSummary};
use crate::batch::plan;
use crate::dispatch::{DispatchSettings, Dispatcher, MailTransport};
use crate::error::BulkSendError;
use crate::message::{build, BulkSendRequest, ProviderMessage, SendParams, SenderDefaults};

/// Response body for a completed bulk send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendReport {
    #[serde(flatten)]
    pub summary: SendSummary,
    /// Set when the audit record could not be written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_warning: Option<String>,
}

/// Everything one invocation needs, injected explicitly.
pub struct Pipeline {
    transport: Arc<dyn MailTransport>,
    audit: Arc<dyn AuditStore>,
    sender: SenderDefaults,
    dispatch: DispatchSettings,
}

impl Pipeline {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        audit: Arc<dyn AuditStore>,
        sender: SenderDefaults,
        dispatch: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            audit,
            sender,
            dispatch,
        }
    }

    /// Run one bulk send.
    ///
    /// Returns an error only for problems found before the first provider
    /// call. Once dispatch starts the result is always a report, even if every
    /// batch failed.
    pub async fn run(&self, request: &BulkSendRequest) -> Result<BulkSendReport, BulkSendError> {
        let deadline = Instant::now() + self.dispatch.invocation_timeout;

        let batches = plan(&request.recipients, self.dispatch.batch_size)?;
        let params = SendParams::from_request(request, &self.sender)?;
        let messages: Vec<ProviderMessage> = batches.iter().map(|b| build(&params, b)).collect();

        info!(
            recipients = request.recipients.len(),
            batches = batches.len(),
            batch_size = self.dispatch.batch_size,
            concurrency = self.dispatch.concurrency,
            uses_template = params.body.is_template(),
            attachments = params.attachments.len(),
            category = %params.category,
            "bulk_send_start"
        );

        let dispatcher = Dispatcher::new(self.transport.clone(), self.dispatch.concurrency, deadline);
        let outcomes = dispatcher.send_all(&messages).await;
        let summary = summarize(&batches, outcomes);

        let context = AuditContext {
            from: params.sender.clone(),
            used_template: params.body.is_template(),
            subject: request.subject.clone().filter(|s| !s.is_empty()),
            category: params.category.clone(),
        };
        let audit_warning = persist(self.audit.as_ref(), &summary, &context)
            .await
            .err()
            .map(|e| format!("audit record not saved: {e}"));

        info!(
            total = summary.total_recipients,
            batches = summary.batches,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            audit_saved = audit_warning.is_none(),
            "bulk_send_complete"
        );

        Ok(BulkSendReport {
            summary,
            audit_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::store::tests::MemoryAuditStore;
    use crate::dispatch::dispatcher::tests::StubTransport;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn sender() -> SenderDefaults {
        SenderDefaults {
            email: Some("noreply@example.com".to_string()),
            name: "Your App".to_string(),
            list_unsubscribe: "<mailto:unsub@example.com>".to_string(),
        }
    }

    fn settings(batch_size: usize) -> DispatchSettings {
        DispatchSettings {
            batch_size,
            concurrency: 4,
            invocation_timeout: Duration::from_secs(30),
        }
    }

    fn request(n: usize) -> BulkSendRequest {
        let recipients: Vec<_> = (0..n)
            .map(|i| json!({"email": format!("r{i}@example.com")}))
            .collect();
        serde_json::from_value(json!({"subject": "Hello", "recipients": recipients})).unwrap()
    }

    #[tokio::test]
    async fn test_partial_failure_still_reports_and_audits() {
        let stub = Arc::new(StubTransport {
            statuses: HashMap::from([("r1@example.com".to_string(), 400)]),
            ..Default::default()
        });
        let audit = Arc::new(MemoryAuditStore::default());
        let pipeline = Pipeline::new(stub, audit.clone(), sender(), settings(1));

        let report = pipeline.run(&request(2)).await.unwrap();

        assert_eq!(report.summary.batches, 2);
        assert!(report.summary.results[0].ok);
        assert!(!report.summary.results[1].ok);
        assert_eq!(report.summary.results[1].status, 400);
        assert!(report.audit_warning.is_none());

        let records = audit.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].batches, 2);
        assert_eq!(records[0].subject.as_deref(), Some("Hello"));
        assert!(!records[0].used_template);
    }

    #[tokio::test]
    async fn test_1200_recipients_in_three_batches() {
        let stub = Arc::new(StubTransport::default());
        let audit = Arc::new(MemoryAuditStore::default());
        let pipeline = Pipeline::new(stub.clone(), audit, sender(), settings(500));

        let report = pipeline.run(&request(1200)).await.unwrap();

        assert_eq!(report.summary.total_recipients, 1200);
        assert_eq!(
            report.summary.results.iter().map(|r| r.count).collect::<Vec<_>>(),
            vec![500, 500, 200]
        );
        assert_eq!(stub.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_audit_failure_is_only_a_warning() {
        let stub = Arc::new(StubTransport::default());
        let audit = Arc::new(MemoryAuditStore {
            fail: true,
            ..Default::default()
        });
        let pipeline = Pipeline::new(stub, audit, sender(), settings(500));

        let report = pipeline.run(&request(3)).await.unwrap();

        assert!(report.summary.results.iter().all(|r| r.ok));
        let warning = report.audit_warning.unwrap();
        assert!(warning.starts_with("audit record not saved"));
    }

    #[tokio::test]
    async fn test_missing_subject_makes_no_calls() {
        let stub = Arc::new(StubTransport::default());
        let audit = Arc::new(MemoryAuditStore::default());
        let pipeline = Pipeline::new(stub.clone(), audit.clone(), sender(), settings(500));
        let request: BulkSendRequest =
            serde_json::from_value(json!({"recipients": [{"email": "a@example.com"}]})).unwrap();

        let err = pipeline.run(&request).await.unwrap_err();

        assert!(matches!(err, BulkSendError::InvalidInput(_)));
        assert!(stub.calls.lock().unwrap().is_empty());
        assert!(audit.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_template_send_records_template_use() {
        let stub = Arc::new(StubTransport::default());
        let audit = Arc::new(MemoryAuditStore::default());
        let pipeline = Pipeline::new(stub, audit.clone(), sender(), settings(500));
        let request: BulkSendRequest = serde_json::from_value(json!({
            "templateId": "d-1",
            "recipients": [{"email": "a@example.com", "vars": {"n": 1}}]
        }))
        .unwrap();

        pipeline.run(&request).await.unwrap();

        let records = audit.records.lock().unwrap();
        assert!(records[0].used_template);
        assert_eq!(records[0].subject, None);
    }

    #[test]
    fn test_report_serialization() {
        let report = BulkSendReport {
            summary: SendSummary {
                total_recipients: 1,
                batches: 0,
                results: vec![],
            },
            audit_warning: Some("audit record not saved: x".to_string()),
        };

        assert_eq!(
            serde_json::to_value(report).unwrap(),
            json!({
                "totalRecipients": 1,
                "batches": 0,
                "results": [],
                "auditWarning": "audit record not saved: x"
            })
        );
    }
}
