//! wardend: the Warden daemon.
//!
//! Single binary that assembles every Warden component around one
//! [`Monitor`] context:
//! - Service registry (compose manifests)
//! - Health check engine + circuit breakers
//! - Dependency graph analyzer
//! - Alert engine + sinks
//! - Healing controller
//! - Readiness aggregator
//! - REST API + Prometheus metrics
//!
//! # Usage
//!
//! ```text
//! wardend --config /etc/warden/warden.toml run
//! wardend readiness            # exit code 1 unless PRODUCTION_READY
//! wardend heal api-gateway     # exit code 1 when every strategy fails
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_core::WardenConfig;
use wardend::Monitor;

#[derive(Parser)]
#[command(name = "wardend", about = "Warden service health daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "warden.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitoring loop and the HTTP API until Ctrl-C.
    Run {
        /// Override `api.listen` from the configuration.
        #[arg(long)]
        listen: Option<String>,
    },
    /// Run one monitoring cycle and print the health snapshot as JSON.
    Check,
    /// Run one monitoring cycle and print the readiness assessment as JSON.
    Readiness,
    /// Run the healing chain for one service.
    Heal {
        /// Service name as registered by discovery.
        service: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = WardenConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let base_dir = config_dir(&cli.config);
    let monitor = Arc::new(Monitor::from_config(config, base_dir)?);

    match cli.command {
        Command::Run { listen } => {
            run(monitor, listen).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            monitor.run_cycle().await;
            let health = monitor.engine().snapshot().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Readiness => {
            monitor.run_cycle().await;
            let assessment = monitor.assess().await;
            println!("{}", serde_json::to_string_pretty(&assessment)?);
            Ok(if assessment.is_production_ready() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Heal { service } => {
            monitor.registry().discover(true).await;
            match monitor.heal(&service).await {
                Some(true) => Ok(ExitCode::SUCCESS),
                Some(false) => Ok(ExitCode::FAILURE),
                None => anyhow::bail!("service {service} is not registered"),
            }
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,warden=debug,wardend=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn run(monitor: Arc<Monitor>, listen: Option<String>) -> anyhow::Result<()> {
    let interval = monitor.config().monitor.check_interval();
    let addr = listen.unwrap_or_else(|| monitor.config().api.listen.clone());

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Monitoring loop ────────────────────────────────────────

    let loop_handle = tokio::spawn(Arc::clone(&monitor).run(interval, shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let router = warden_api::build_router(monitor);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding API listener on {addr}"))?;
    info!(%addr, "API server starting");

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;
    let _ = loop_handle.await;

    info!("Warden daemon stopped");
    Ok(())
}
