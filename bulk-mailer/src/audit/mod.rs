//! Result aggregation and audit persistence.
//!
//! `summarize` is pure; `persist` is the invocation's only side effect beyond
//! the provider calls. A failed persist never changes the send result.

pub mod store;
pub mod summary;

pub use store::{persist, AuditStore, HttpAuditStore, LogAuditStore};
pub use summary::{summarize, AuditContext, AuditRecord, SendSummary};
