//! Bulk Mailer Web Server.
//!
//! Serves `POST /bulk-email`: splits the recipient list into provider-sized
//! batches, sends each batch through SendGrid, and records one audit document
//! per invocation.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bulkmail::web::router;
use bulkmail::{AppState, AuditStore, Config, HttpAuditStore, LogAuditStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("bulk_mailer_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        sendgrid_configured = config.sendgrid_api_key.is_some(),
        default_sender_configured = config.from_email.is_some(),
        batch_size = config.batch_size,
        concurrency = config.dispatch_concurrency,
        audit_store_configured = config.audit_store_url.is_some(),
        "config_loaded"
    );
    if config.sendgrid_api_key.is_none() {
        warn!("sendgrid_api_key_missing");
    }

    // Create a shared HTTP client for provider and audit calls
    let client = Client::builder()
        .pool_max_idle_per_host(config.dispatch_concurrency)
        .build()
        .context("Failed to create HTTP client")?;

    let audit: Arc<dyn AuditStore> = match &config.audit_store_url {
        Some(url) => Arc::new(
            HttpAuditStore::new(
                client.clone(),
                url,
                &config.audit_collection,
                config.audit_store_token.clone(),
                config.audit_timeout(),
            )
            .context("Failed to configure audit store")?,
        ),
        None => {
            warn!("audit_store_not_configured");
            Arc::new(LogAuditStore)
        }
    };

    let port = config.port;
    let app = router(AppState::new(config, client, audit));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
