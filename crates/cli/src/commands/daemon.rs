// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level commands

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat, StatusView};

pub async fn status(client: &DaemonClient, format: OutputFormat) -> anyhow::Result<()> {
    let view = StatusView::from(client.status().await?);
    output::print(&view, format);
    Ok(())
}

pub async fn ping(client: &DaemonClient) -> anyhow::Result<()> {
    client.ping().await?;
    let version = client.hello().await?;
    println!("pong (cadenced {})", version);
    Ok(())
}

pub async fn shutdown(client: &DaemonClient) -> anyhow::Result<()> {
    client.shutdown().await?;
    println!("Daemon shutting down");
    Ok(())
}
