//! Bulk Mailer - batched transactional email dispatch.
//!
//! This library provides the modules behind the `bulk-mailer` web server:
//! - `batch`: partitions recipients into provider-sized batches
//! - `message`: request types and SendGrid payload building
//! - `dispatch`: per-batch provider calls with failure isolation
//! - `audit`: send summaries and the append-only audit record
//! - `web`: the `/bulk-email` HTTP contract
//!
//! ## Architecture
//!
//! ```text
//! POST /bulk-email → plan → build per batch → dispatch → summarize → audit store
//! ```

pub mod audit;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod web;

// Re-export commonly used types
pub use audit::{AuditRecord, AuditStore, HttpAuditStore, LogAuditStore, SendSummary};
pub use batch::{plan, Batch};
pub use config::Config;
pub use dispatch::{BatchOutcome, Dispatcher, MailTransport, SendGridTransport};
pub use error::{AuditError, BulkSendError, TransportError};
pub use message::{BulkSendRequest, ProviderMessage, Recipient};
pub use pipeline::{BulkSendReport, Pipeline};
pub use web::AppState;
