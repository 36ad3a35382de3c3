//! Dispatch module: provider transport and the batch dispatcher.
//!
//! ## Flow
//!
//! ```text
//! [ProviderMessage] → Dispatcher::send_all() → MailTransport::send() per batch → [BatchOutcome]
//! ```

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{BatchOutcome, DispatchSettings, Dispatcher, DEADLINE_ERROR, GENERIC_PROVIDER_ERROR};
pub use transport::{MailTransport, SendGridTransport, TransportResponse, TransportSettings};
