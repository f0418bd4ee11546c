//! # aerie-server
//!
//! Completion relay for the Aerie chat application.
//!
//! This binary provides:
//! - **`POST /api/chat`**: turns `{ "input": ... }` into `{ "response": ... }`
//!   by running a local text-generation script under a hard timeout
//! - **`GET /`**: liveness probe
//!
//! Failures never leak to clients as bare errors; they arrive as a 500
//! whose body still carries an in-character `response` string.

mod api;
mod completion;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::completion::CompletionEngine;
use crate::config::RelayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aerie_server=debug")),
        )
        .init();

    info!("Starting Aerie relay server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = RelayConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build the completion engine and HTTP state
    // -----------------------------------------------------------------------
    let engine = Arc::new(CompletionEngine::from_config(&config));
    let state = AppState { engine };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
