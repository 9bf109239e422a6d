// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor control commands

use clap::Args;

use crate::client::DaemonClient;

/// One processor by name, or every processor with `--all`
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Processor name
    name: Option<String>,

    /// Apply to every processor
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Start,
    Stop,
    Abort,
}

pub async fn control(client: &DaemonClient, action: Action, target: Target) -> anyhow::Result<()> {
    let verb = match action {
        Action::Start => "Started",
        Action::Stop => "Stopped",
        Action::Abort => "Aborted",
    };
    match target.name {
        Some(name) => {
            match action {
                Action::Start => client.start(&name).await?,
                Action::Stop => client.stop(&name).await?,
                Action::Abort => client.abort(&name).await?,
            }
            println!("{} {}", verb, name);
        }
        None => {
            match action {
                Action::Start => client.start_all().await?,
                Action::Stop => client.stop_all().await?,
                Action::Abort => client.abort_all().await?,
            }
            println!("{} all processors", verb);
        }
    }
    Ok(())
}

pub async fn force(client: &DaemonClient, name: &str) -> anyhow::Result<()> {
    client.force(name).await?;
    println!("Queued {}", name);
    Ok(())
}

pub async fn cancel(client: &DaemonClient, name: &str) -> anyhow::Result<()> {
    let removed = client.cancel_pending(name).await?;
    match removed {
        0 => println!("Nothing pending for {}", name),
        n => println!("Cancelled {} pending run(s) of {}", n, name),
    }
    Ok(())
}

pub async fn wait(client: &DaemonClient, name: &str) -> anyhow::Result<()> {
    client.wait_for_exit(name).await?;
    println!("{} exited", name);
    Ok(())
}
