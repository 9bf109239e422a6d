// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use std::fmt;

use cadence_core::RunnerStatus;
use clap::ValueEnum;
use serde::Serialize;

use crate::client::DaemonStatus;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// `cadence status` view
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub uptime_secs: u64,
    pub processors: Vec<RunnerStatus>,
    pub queue: Vec<String>,
}

impl From<DaemonStatus> for StatusView {
    fn from(status: DaemonStatus) -> Self {
        Self {
            uptime_secs: status.uptime_secs,
            processors: status.processors,
            queue: status.queue,
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "uptime: {}s", self.uptime_secs)?;
        if self.processors.is_empty() {
            return writeln!(f, "No processors");
        }
        writeln!(
            f,
            "{:<20} {:<10} {:<21} QUEUE",
            "NAME", "STATE", "NEXT FIRE"
        )?;
        for p in &self.processors {
            let next = p
                .next_fire_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<20} {:<10} {:<21} {}",
                p.name,
                p.state.to_string(),
                next,
                queue_position(p)
            )?;
        }
        Ok(())
    }
}

fn queue_position(status: &RunnerStatus) -> &'static str {
    if status.admitted {
        "admitted"
    } else if status.pending {
        "pending"
    } else {
        "-"
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
