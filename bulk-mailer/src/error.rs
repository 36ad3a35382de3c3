//! Error types for the bulk send pipeline.
//!
//! Only failures that stop an invocation before dispatch live in
//! [`BulkSendError`]. Per-batch transport failures are [`TransportError`] and
//! are turned into data by the dispatcher; audit failures are [`AuditError`]
//! and only ever reach the caller as a warning.

use axum::http::StatusCode;
use thiserror::Error;

/// Hard failure of a bulk send invocation.
#[derive(Debug, Error)]
pub enum BulkSendError {
    /// The request is malformed or incomplete.
    #[error("{0}")]
    InvalidInput(String),

    /// Required process configuration is missing.
    #[error("{0}")]
    Configuration(String),

    /// Anything else that went wrong before a summary could be produced.
    #[error("{0}")]
    Internal(String),
}

impl BulkSendError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BulkSendError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BulkSendError::Configuration(_) | BulkSendError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Failure of a single provider call that produced no HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_builder() {
            TransportError::Request(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Failure to write an audit record.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit store unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("audit store rejected record ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid audit store url: {0}")]
    InvalidUrl(String),
}
