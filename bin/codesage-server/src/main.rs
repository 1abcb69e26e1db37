//! codesage-server – entry point.
//!
//! `serve` (the default) startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Build the Gemini client and the CodeSage service.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.
//!
//! `chat` runs the terminal client against an already running server.

mod chat;
mod config;
mod error;
mod middleware;
mod pages;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codesage_core::{CodeSageService, GeminiClient};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "codesage-server", version, about = "CodeSage debugging assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the chat page and the `/codesage` API.
    Serve,
    /// Chat with a running server from the terminal.
    Chat {
        /// Server root URL.
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::Chat { server, timeout_secs } => {
            chat::run(&server, Duration::from_secs(timeout_secs)).await
        }
    }
}

fn init_tracing(cfg: &Config) {
    // Warn loudly if the configured value is not a valid filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CODESAGE_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "codesage-server starting");

    // ── 3. Gemini client + service ─────────────────────────────────────────────
    if cfg.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }
    let client = GeminiClient::new(cfg.gemini_settings())?;
    info!(model = client.model(), timeout_secs = cfg.upstream_timeout_secs, "Gemini client ready");
    let service = CodeSageService::new(client, cfg.generation_config()?);

    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::new(cfg, service)?);

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("codesage-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
