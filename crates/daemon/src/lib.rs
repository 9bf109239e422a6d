// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cadence-daemon library: control protocol and built-in processors
//!
//! Shared by the `cadenced` binary and the `cadence` CLI.

pub mod protocol;
pub mod shell;

pub use protocol::{ProtocolError, Request, Response, PROTOCOL_VERSION};

use std::path::PathBuf;

/// Environment variable overriding the control socket path
pub const SOCKET_ENV: &str = "CADENCE_SOCKET";

/// Default control socket: `$XDG_RUNTIME_DIR/cadence/cadenced.sock`,
/// falling back to the system temp directory
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cadence")
        .join("cadenced.sock")
}

/// Default log file: `$XDG_STATE_HOME/cadence/cadenced.log`,
/// falling back to the system temp directory
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cadence")
        .join("cadenced.log")
}
