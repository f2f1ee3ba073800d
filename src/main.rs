#![forbid(unsafe_code)]

//! `repl-relay` — HTTP bridge for a single interactive REPL subprocess.
//!
//! Bootstraps configuration from the environment and CLI flags, spawns the
//! REPL session, and serves the HTTP surface until a shutdown signal
//! arrives, after which the session is torn down gracefully.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use repl_relay::config::ServiceConfig;
use repl_relay::server::{self, AppState};
use repl_relay::session::{ReplSession, SpawnConfig};
use repl_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "repl-relay", about = "HTTP bridge for an interactive REPL subprocess", version, long_about = None)]
struct Cli {
    /// HTTP listening port (overrides the PORT environment variable).
    #[arg(long)]
    port: Option<u16>,

    /// Working directory for the REPL process (overrides REPL_PATH).
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Default per-command timeout in seconds; 0 disables the timeout
    /// (overrides REPL_TIMEOUT_SECONDS).
    #[arg(long)]
    timeout_seconds: Option<u64>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("repl-relay server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Resolve configuration ───────────────────────────
    let mut config = ServiceConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ws) = args.workdir {
        let canonical = ws
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid workdir override: {err}")))?;
        config.workdir = Some(canonical);
    }
    if let Some(seconds) = args.timeout_seconds {
        config.timeout_seconds = seconds;
    }
    info!(
        port = config.port,
        program = %config.program,
        timeout_seconds = config.timeout_seconds,
        "configuration resolved"
    );

    // ── Start the REPL session ──────────────────────────
    let spawn = SpawnConfig {
        program: config.program.clone(),
        args: config.args.clone(),
        workdir: config.workdir.clone(),
    };
    let session = Arc::new(ReplSession::start(&spawn)?);
    info!("repl session started");

    // ── Serve HTTP until a shutdown signal arrives ──────
    let state = Arc::new(AppState {
        session: Arc::clone(&session),
        default_timeout: config.default_timeout(),
    });

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(state, config.port, server_ct).await {
            error!(%err, "http server failed");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = server_handle.await;

    // ── Tear down the REPL session ──────────────────────
    if let Err(err) = session.shutdown().await {
        error!(%err, "error during repl session shutdown");
    }
    info!("repl-relay shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
