//! # Warden - Stillwater Gatekeeper
//!
//! Sits in front of the mystic chat app. Screens every request (host
//! allow-list, Tor exits, browser heuristics), enforces global and
//! per-fingerprint budgets with math-challenge escalation, sanitises
//! prompts before they reach the model, and keeps signed, expiring
//! question/answer shares.
//!
//! ## Architecture
//! ```text
//! Browser → Warden → LLM (Gemini)
//!              ↓
//!        In-memory state (challenges, windows, shares, feedback)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod challenge;
mod clock;
mod config;
mod error;
mod gatekeeper;
mod identity;
mod limiter;
mod llm;
mod maintenance;
mod preview;
mod routes;
mod sanitize;
mod signing;
mod state;
mod store;
mod tor;

use clock::SystemClock;
use config::AppConfig;
use llm::GeminiClient;
use maintenance::{Maintenance, sweep_worker, tor_refresh_worker};
use state::AppState;

/// Stillwater Warden - abuse-mitigation gateway
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/warden.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Secret for signing share records (overrides config)
    #[arg(long, env = "SHARE_SECRET", hide_env_values = true)]
    share_secret: Option<String>,

    /// Secret for signing challenges (overrides config)
    #[arg(long, env = "CHALLENGE_SECRET", hide_env_values = true)]
    challenge_secret: Option<String>,

    /// Upstream model API key (overrides config)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local .env is optional
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🌊 Starting Stillwater Warden v{}", env!("CARGO_PKG_VERSION"));

    // Load and validate configuration
    let config = AppConfig::load(&args.config, &args)?;
    config
        .validate()
        .context("Refusing to start with invalid configuration")?;
    info!("📋 Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let listen_addr = config.server.listen_addr.clone();
    let llm = Arc::new(GeminiClient::new(&config.llm)?);
    let state = AppState::new(config, Arc::new(SystemClock), llm)?;

    // Spawn background workers
    let maintenance = Arc::new(Maintenance::new(state.clone()));
    tokio::spawn(sweep_worker(maintenance, shutdown_tx.subscribe()));
    tokio::spawn(tor_refresh_worker(state.clone(), shutdown_tx.subscribe()));

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("🚀 Warden listening on {}", listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("Server error")?;

    info!("👋 Warden shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
