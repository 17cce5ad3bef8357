//! `ledger-vault`: field-encryption sidecar entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP).
//! 3. Import the field encryption key. A bad key aborts startup.
//! 4. Load the field registry (built-in or from `REGISTRY_PATH`).
//! 5. Build the Axum router and serve until SIGINT/SIGTERM.

mod config;
mod registry;
mod server;
mod telemetry;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use fieldcrypt::{FieldKey, RowTransform};
use tracing::info;

use crate::config::Config;
use crate::server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let mut cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "ledger-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key import
    // -----------------------------------------------------------------------
    let secret = cfg.take_key_secret();
    let key = FieldKey::import(secret.expose())
        .context("FIELD_ENCRYPTION_KEY could not be imported")?;
    drop(secret);
    info!(key_bits = key.bits(), "field key imported");

    // -----------------------------------------------------------------------
    // 4. Field registry
    // -----------------------------------------------------------------------
    let registry = registry::load(&cfg).await?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let transform = RowTransform::new(Arc::new(registry), Arc::new(key));
    let state = AppState::new(transform, cfg.table_header_name.clone());
    let router = server::router::build(state, Duration::from_secs(cfg.request_timeout_secs));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ledger-vault stopped");
    telemetry::shutdown();
    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
