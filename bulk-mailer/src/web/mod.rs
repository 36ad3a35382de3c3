//! Web server module for the bulk email endpoint.
//!
//! ```text
//! GET  /health      liveness probe
//! *    /bulk-email  OPTIONS preflight, POST bulk send, 405 otherwise
//! ```

pub mod handlers;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{bulk_email, health, AppState, ErrorResponse, HealthResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/bulk-email", any(bulk_email))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
