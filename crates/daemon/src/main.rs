// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence daemon (cadenced)
//!
//! Background process that owns the processor runners and answers control
//! requests on a Unix socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;
mod server;

use std::path::PathBuf;

use cadence_core::Trigger;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{Config, LifecycleError};
use crate::server::ServerContext;

#[derive(Parser, Debug)]
#[command(name = "cadenced", version, about = "Cadence scheduler daemon")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "CADENCE_CONFIG", default_value = "cadence.toml")]
    config: PathBuf,

    /// Control socket path (overrides `[daemon].socket`)
    #[arg(long, env = cadence_daemon::SOCKET_ENV)]
    socket: Option<PathBuf>,

    /// Validate the configuration, print the processors and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(&args.config, args.socket)?;

    if args.check {
        return check(&config);
    }

    // Write startup marker to log (before tracing setup, so the CLI can find it)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting cadenced with {}", config.config_path.display());

    // Start daemon
    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd, CLI waiting for startup)
    println!("READY");

    let ctx = ServerContext::new(&daemon);
    let shutdown_requested = std::sync::Arc::clone(&daemon.shutdown_requested);

    // Main loop
    loop {
        tokio::select! {
            // Accept client connections; a blocking call must not stall the others
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server::handle_connection(ctx, stream).await {
                                error!("Error handling connection: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }

            // Graceful shutdown on SIGTERM
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            // Graceful shutdown on SIGINT
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }

            // Shutdown requested via IPC
            _ = shutdown_requested.notified() => {
                info!("Shutdown requested via IPC, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown().await?;

    info!("Daemon stopped");
    Ok(())
}

/// Bind every processor without starting anything
fn check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let bindings = config.scheduler.bind(&lifecycle::registry())?;
    for binding in &bindings {
        match &binding.trigger {
            Some(trigger) => println!("{}\t{}", binding.name(), trigger.name()),
            None => println!("{}\t(manual)", binding.name()),
        }
    }
    println!("{} processors OK", bindings.len());
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- cadenced: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- cadenced: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoLogDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoLogDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
