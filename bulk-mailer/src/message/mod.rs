//! Message module: inbound request types and provider payload building.
//!
//! ## Flow
//!
//! ```text
//! BulkSendRequest → SendParams::from_request() → build(params, batch) → ProviderMessage
//! ```

pub mod builder;
pub mod types;

pub use builder::{
    build, resolve_sender, AttachmentPayload, Content, EmailAddress, MessageBody,
    Personalization, ProviderMessage, SendParams, SenderDefaults,
};
pub use types::{Attachment, BulkSendRequest, Recipient, SenderOverride, DEFAULT_CATEGORY};
