//! EventRelay Server - Main entry point.
//!
//! This binary starts the relay server with:
//! - Structured JSON logging
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! The binary runs on an empty in-process memory store and has no way to
//! create sessions, so every event request is answered with 401 until a real
//! store is supplied. Embedders wire their backend in through
//! [`AppState::with_store`](eventrelay_server::routes::AppState::with_store).
//!
//! # Configuration
//!
//! See [`eventrelay_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! PORT=8080 RUST_LOG=debug cargo run --release --bin eventrelay-server
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use eventrelay_server::config::{Config, DEFAULT_LOG_FILTER};
use eventrelay_server::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  PORT                  - HTTP server port (default: 8080)");
            eprintln!("  EVENTRELAY_BIND_ADDR  - Listen address (default: 0.0.0.0)");
            eprintln!("  RUST_LOG              - Log level filter (default: {DEFAULT_LOG_FILTER})");
            return ExitCode::from(1);
        }
    };

    let bind_addr = config.socket_addr();
    info!(address = %bind_addr, store = "memory", "EventRelay server starting");

    warn!(
        "Running on an empty in-memory store; no sessions exist, so every event \
         request will be rejected until a store is supplied via AppState::with_store"
    );

    let app = create_router(AppState::new());

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => {
            info!(address = %bind_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` (default: [`DEFAULT_LOG_FILTER`]).
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves when SIGINT or SIGTERM is received.
///
/// If a handler cannot be installed, that signal is never observed and the
/// failure is logged.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
