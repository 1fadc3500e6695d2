#![forbid(unsafe_code)]

//! `minecloud-wrapper`: game server supervisor binary.
//!
//! Launches the server JVM, supervises its console and exposes the control
//! surface over HTTP.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use minecloud_wrapper::http;
use minecloud_wrapper::{AppError, Result, Supervisor, WrapperConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "minecloud-wrapper", about = "Game server supervisor", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address the HTTP control surface binds to.
    #[arg(long)]
    address: Option<String>,

    /// Server JAR file.
    #[arg(long)]
    jar: Option<PathBuf>,

    /// Working directory for the server process.
    #[arg(long)]
    server_dir: Option<PathBuf>,

    /// World data directory.
    #[arg(long)]
    world_dir: Option<PathBuf>,

    /// Directory world snapshots are copied into.
    #[arg(long)]
    snapshot_path: Option<PathBuf>,

    /// Heap size in MiB; defaults to 80% of available memory.
    #[arg(long, env = "MINECLOUD_MEMORY_MIB")]
    memory_mib: Option<u64>,

    /// Java executable.
    #[arg(long)]
    java: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    /// Layer the flags over `config`; flags win.
    fn apply(self, config: &mut WrapperConfig) {
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(jar) = self.jar {
            config.jar = jar;
        }
        if let Some(server_dir) = self.server_dir {
            config.server_dir = server_dir;
        }
        if let Some(world_dir) = self.world_dir {
            config.world_dir = world_dir;
        }
        if let Some(snapshot_dir) = self.snapshot_path {
            config.snapshot_dir = snapshot_dir;
        }
        if let Some(memory_mib) = self.memory_mib {
            config.memory_mib = Some(memory_mib);
        }
        if let Some(java) = self.java {
            config.java = java;
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("minecloud-wrapper bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => WrapperConfig::load_unvalidated(path)?,
        None => WrapperConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    let addr = config.socket_addr()?;
    info!(
        jar = %config.jar.display(),
        world_dir = %config.world_dir.display(),
        "configuration loaded"
    );

    // ── Launch the server ───────────────────────────────
    let supervisor = Supervisor::launch(&config).map_err(|err| {
        error!(%err, "server launch failed");
        err
    })?;

    // ── Start the control surface ───────────────────────
    let listener = http::bind(addr).await?;
    let ct = CancellationToken::new();
    let http_ct = ct.clone();
    let http_supervisor = supervisor.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(listener, http_supervisor, http_ct).await {
            error!(%err, "http control surface failed");
        }
    });

    // ── Wait for exit or a shutdown signal ──────────────
    tokio::select! {
        () = supervisor.wait_terminated() => {
            info!("server process exited");
        }
        () = shutdown_signal() => {
            info!("shutdown signal received, terminating server");
            supervisor.kill();
            supervisor.wait_terminated().await;
        }
    }

    ct.cancel();
    if let Err(err) = http_handle.await {
        error!(%err, "http task panicked");
    }
    info!("minecloud-wrapper shut down");

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
