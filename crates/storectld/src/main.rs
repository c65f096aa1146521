#![forbid(unsafe_code)]
//! Control-plane daemon entry point: parses CLI flags, resolves config,
//! spawns the executor sidecar, and drives the control socket's accept
//! loop on a single-threaded runtime (spec.md §2/§8's single-reactor
//! invariant).

mod config;
mod context;
mod error;
mod process;
mod scst;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sto_engine::Registry;
use tokio::process::Command;
use tracing::{error, info};

use config::StorectldConfig;
use context::RequestCtx;
use error::DaemonError;

/// Storage control-plane daemon.
#[derive(Debug, Parser)]
#[command(name = "storectld")]
#[command(about = "Storage control-plane daemon")]
pub struct Cli {
    /// Path to config.toml. Defaults to none (built-in defaults apply).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the control socket path.
    #[arg(long)]
    control_socket: Option<PathBuf>,

    /// Override the executor sidecar's socket path.
    #[arg(long)]
    executor_socket: Option<PathBuf>,

    /// Override the executor sidecar binary path.
    #[arg(long)]
    executor_binary: Option<PathBuf>,
}

fn main() -> Result<(), DaemonError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(
                    config::default_rust_log_value().unwrap_or("info"),
                )),
        )
        .init();

    let config = StorectldConfig::load(cli.config.as_deref(), &cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DaemonError::BindControlSocket {
            path: config.control_socket.clone(),
            source: e,
        })?;

    runtime.block_on(run(config))
}

async fn run(config: StorectldConfig) -> Result<(), DaemonError> {
    info!(
        control_socket = ?config.control_socket,
        executor_socket = ?config.executor_socket,
        "starting storectld"
    );

    let mut executor_command = Command::new(&config.executor_binary);
    executor_command
        .arg("--socket")
        .arg(&config.executor_socket)
        .kill_on_drop(true);

    match process::spawn_executor_with_retry(&mut executor_command, &config.executor_binary) {
        Ok(_child) => info!(binary = %config.executor_binary.display(), "executor sidecar spawned"),
        Err(err) => {
            error!(%err, "failed to spawn executor sidecar, continuing assuming it is externally managed");
        }
    }

    let executor = Arc::new(sto_rpc::Pool::new(config.executor_socket.clone()));

    let mut registry: Registry<RequestCtx> = Registry::new();
    scst::register(&mut registry);
    let registry = Arc::new(registry);

    let listener = server::bind_control_socket(&config.control_socket)?;
    info!(path = %config.control_socket.display(), "control socket bound");

    server::serve(listener, registry, executor).await
}
