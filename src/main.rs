//! # Audio STT Backend - Main Application Entry Point
//!
//! HTTP service that transcribes remote audio files. A client posts a URL,
//! the service downloads the audio to a temporary file, sends it to a hosted
//! speech-to-text API and answers with the transcript.
//!
//! ## Application Architecture:
//! - **config**: Startup configuration (defaults, config.toml, environment)
//! - **error**: Request error taxonomy and its HTTP mapping
//! - **state**: Context object shared by every request
//! - **health**: Liveness endpoint
//! - **download**: Bounded, cancellable streaming download to disk
//! - **transcription**: Client for the speech-to-text provider
//! - **handlers**: `POST /transcribe`, the request pipeline
//! - **middleware**: Request logging

mod config;
mod download;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;
mod transcription;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::AppState;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from `.env`, config.toml and environment variables
/// 2. **Sets up logging** with tracing
/// 3. **Builds the shared request context** (HTTP client, provider client, temp dir)
/// 4. **Runs the HTTP server** until it fails or a shutdown signal arrives
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting audio-stt-backend v{}", env!("CARGO_PKG_VERSION"));

    let app_state = AppState::new(&config)?;
    let bind_addr = (config.server.host.clone(), config.server.port);

    info!(
        tmp_dir = %app_state.fetcher.dir().display(),
        max_bytes = app_state.fetcher.limits().max_bytes,
        timeout_secs = app_state.fetcher.limits().timeout.as_secs(),
        model = %app_state.transcriber.model(),
        "Pipeline configured"
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run();

    info!("API listening on http://localhost:{}", config.server.port);

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Initialize structured logging.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "audio_stt_backend=info")
/// - If not set, defaults to "audio_stt_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_stt_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM from the process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
