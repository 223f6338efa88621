// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tether Daemon (tetherd)
//!
//! Background process that keeps a set of TCP endpoints connected and tears
//! them down cleanly on SIGINT or SIGTERM.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod lifecycle;

use std::path::PathBuf;

use clap::Parser;
use tether_core::Scope;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::config::DaemonConfig;
use crate::lifecycle::LifecycleError;

#[derive(Parser)]
#[command(name = "tetherd", version, about = "Keep TCP endpoints connected")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: PathBuf,

    /// Validate the config, print the endpoints, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = DaemonConfig::load(&args.config)?;

    if args.check {
        for endpoint in &config.endpoints {
            println!(
                "{} {} heartbeat={:?} connect_timeout={:?}",
                endpoint.name, endpoint.address, endpoint.heartbeat_interval, endpoint.connect_timeout
            );
        }
        return Ok(());
    }

    // Set up logging
    let _log_guard = setup_logging(&config)?;

    info!(config = %args.config.display(), "Starting tetherd");

    let root = Scope::background();
    let daemon = lifecycle::startup(config, &root).await;

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let connected = daemon.status().iter().filter(|s| s.peer.is_some()).count();
    info!(
        endpoints = daemon.status().len(),
        connected, "Daemon ready"
    );

    // Signal ready for parent process (e.g., systemd, tests waiting for startup)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = match &config.log_path {
        Some(log_path) => {
            let dir = log_path
                .parent()
                .ok_or_else(|| LifecycleError::LogPath(log_path.clone()))?;
            let file_name = log_path
                .file_name()
                .ok_or_else(|| LifecycleError::LogPath(log_path.clone()))?;

            // Create log directory if needed
            std::fs::create_dir_all(dir)?;

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            tracing_appender::non_blocking(file_appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
