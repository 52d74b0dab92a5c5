//! # Usher - Vouch verified-submission engine
//!
//! Gates testimonial publishing behind proof of control over an email
//! address: identity capture, one-time code verification, content
//! submission. Sessions are in-process; codes and finished testimonials
//! live in Redis.
//!
//! ## Architecture
//! ```text
//! Client UI → Usher → Redis (codes, testimonials)
//!                └→ Delivery seam (mail, out-of-band)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod flow;
mod routes;
mod state;
mod stores;

use config::AppConfig;
use flow::session_reaper;
use state::AppState;

/// Vouch Usher - verified-submission flow engine
#[derive(Parser, Debug)]
#[command(name = "usher")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/usher.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting Vouch Usher v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    info!("Redis connected: {}", config.redis_url);

    // Spawn the idle-session reaper
    let reaper_engine = Arc::clone(&state.engine);
    let reaper_shutdown = shutdown_tx.subscribe();
    let idle_ttl = Duration::from_secs(config.session.idle_ttl_secs);
    let sweep_interval = Duration::from_secs(config.session.sweep_interval_secs);
    tokio::spawn(async move {
        session_reaper(reaper_engine, idle_ttl, sweep_interval, reaper_shutdown).await;
    });

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Usher listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Usher shutdown complete");
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
