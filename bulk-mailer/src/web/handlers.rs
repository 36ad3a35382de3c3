//! Bulk email endpoint handlers.
//!
//! `/bulk-email` handles its own method dispatch so that preflight, rejected
//! methods and errors all carry the same CORS headers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::audit::AuditStore;
use crate::dispatch::SendGridTransport;
use crate::error::BulkSendError;
use crate::message::BulkSendRequest;
use crate::pipeline::{BulkSendReport, Pipeline};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// HTTP client shared by all provider calls
    pub client: Client,
    pub audit: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(config: Config, client: Client, audit: Arc<dyn AuditStore>) -> Self {
        Self {
            config: Arc::new(config),
            client,
            audit,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Bulk Email
// =============================================================================

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// CORS headers echoing the caller's origin.
fn cors_headers(request_headers: &HeaderMap) -> [(HeaderName, HeaderValue); 4] {
    let origin = request_headers
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, origin),
        (header::VARY, HeaderValue::from_static("Origin")),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST,OPTIONS"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ),
    ]
}

/// Bulk email endpoint.
///
/// - `OPTIONS`: 204 preflight
/// - `POST`: validate, dispatch, return the send summary (200 even on
///   partial batch failure)
/// - anything else: 405
pub async fn bulk_email(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let cors = cors_headers(&headers);

    match method {
        Method::OPTIONS => (StatusCode::NO_CONTENT, cors).into_response(),
        Method::POST => match handle_post(&state, &body).await {
            Ok(report) => (StatusCode::OK, cors, Json(report)).into_response(),
            Err(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    error!(error = %e, "bulk_email_failed");
                } else {
                    warn!(error = %e, "bulk_email_rejected");
                }
                (status, cors, Json(ErrorResponse { error: e.to_string() })).into_response()
            }
        },
        other => {
            warn!(method = %other, "bulk_email_method_not_allowed");
            (
                StatusCode::METHOD_NOT_ALLOWED,
                cors,
                Json(ErrorResponse {
                    error: "Method Not Allowed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn handle_post(state: &AppState, body: &[u8]) -> Result<BulkSendReport, BulkSendError> {
    // An empty body reads as `{}` and fails on the recipients check below.
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)
            .map_err(|_| BulkSendError::InvalidInput("Invalid JSON body".to_string()))?
    };

    let has_recipients = value
        .get("recipients")
        .and_then(Value::as_array)
        .is_some_and(|r| !r.is_empty());
    if !has_recipients {
        return Err(BulkSendError::InvalidInput(
            "Missing recipients[]".to_string(),
        ));
    }

    let request: BulkSendRequest = serde_json::from_value(value)
        .map_err(|e| BulkSendError::InvalidInput(format!("Invalid request: {e}")))?;

    // Fail before any send if the transport is not configured.
    let transport = SendGridTransport::new(state.client.clone(), state.config.transport_settings()?);

    info!(
        recipients = request.recipients.len(),
        template_id = ?request.template_id(),
        "bulk_email_received"
    );

    let pipeline = Pipeline::new(
        Arc::new(transport),
        state.audit.clone(),
        state.config.sender_defaults(),
        state.config.dispatch_settings(),
    );

    pipeline.run(&request).await
}
