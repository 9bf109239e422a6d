// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cadence - control a running cadenced

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::processor::{Action, Target};
use commands::{daemon, processor};

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "cadence", version, about = "Cadence - control the scheduler daemon")]
struct Cli {
    /// Daemon control socket
    #[arg(long, global = true, env = cadence_daemon::SOCKET_ENV)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every processor and the admission queue
    Status {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Start a processor's runner
    Start(Target),
    /// Stop a processor's runner after its current run
    Stop(Target),
    /// Interrupt a processor's current run and stop its runner
    Abort(Target),
    /// Queue a run regardless of the trigger
    Force {
        /// Processor name
        name: String,
    },
    /// Withdraw queued runs that have not been admitted yet
    Cancel {
        /// Processor name
        name: String,
    },
    /// Block until a processor's runner has exited
    Wait {
        /// Processor name
        name: String,
    },
    /// Check that the daemon is answering
    Ping,
    /// Stop every processor and exit the daemon
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket = cli
        .socket
        .unwrap_or_else(cadence_daemon::default_socket_path);
    let client = DaemonClient::connect(&socket)?;

    match cli.command {
        Commands::Status { output } => daemon::status(&client, output).await?,
        Commands::Start(target) => processor::control(&client, Action::Start, target).await?,
        Commands::Stop(target) => processor::control(&client, Action::Stop, target).await?,
        Commands::Abort(target) => processor::control(&client, Action::Abort, target).await?,
        Commands::Force { name } => processor::force(&client, &name).await?,
        Commands::Cancel { name } => processor::cancel(&client, &name).await?,
        Commands::Wait { name } => processor::wait(&client, &name).await?,
        Commands::Ping => daemon::ping(&client).await?,
        Commands::Shutdown => daemon::shutdown(&client).await?,
    }

    Ok(())
}
