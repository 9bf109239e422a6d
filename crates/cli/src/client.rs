// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::time::Duration;

use cadence_core::RunnerStatus;
use cadence_daemon::protocol::{self, ProtocolError};
use cadence_daemon::{Request, Response, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::UnixStream;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests (ping, status, start, stop, shutdown)
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("CADENCE_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for requests that block until runners exit (`wait`, `stop --all`)
pub fn timeout_wait() -> Duration {
    parse_duration_ms("CADENCE_TIMEOUT_WAIT_MS").unwrap_or(Duration::from_secs(60 * 60))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running (no socket at {0})")]
    DaemonNotRunning(PathBuf),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon status snapshot
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub processors: Vec<RunnerStatus>,
    pub queue: Vec<String>,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
    ipc_timeout: Duration,
    wait_timeout: Duration,
}

impl DaemonClient {
    /// Connect to a running daemon
    pub fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning(socket_path.to_path_buf()));
        }

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            ipc_timeout: timeout_ipc(),
            wait_timeout: timeout_wait(),
        })
    }

    /// Override the timeouts read from the environment
    pub fn with_timeouts(mut self, ipc: Duration, wait: Duration) -> Self {
        self.ipc_timeout = ipc;
        self.wait_timeout = wait;
        self
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        // Encode and send request with write timeout
        let data = protocol::encode(&request)?;
        tokio::time::timeout(write_timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        // Read response with read timeout
        let response_bytes =
            tokio::time::timeout(read_timeout, protocol::read_message(&mut reader))
                .await
                .map_err(|_| ProtocolError::Timeout)??;

        let response: Response = protocol::decode(&response_bytes)?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, self.ipc_timeout, self.ipc_timeout)
            .await
    }

    /// Send a request that expects a plain `Ok`
    async fn send_ok(&self, request: Request) -> Result<(), ClientError> {
        expect_ok(self.send(request).await?)
    }

    /// Like `send_ok`, for requests the daemon answers only after runners exit
    async fn send_ok_waiting(&self, request: Request) -> Result<(), ClientError> {
        let response = self
            .send_with_timeout(request, self.wait_timeout, self.ipc_timeout)
            .await?;
        expect_ok(response)
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                processors,
                queue,
            } => Ok(DaemonStatus {
                uptime_secs,
                processors,
                queue,
            }),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn start_all(&self) -> Result<(), ClientError> {
        self.send_ok(Request::StartAll).await
    }

    pub async fn start(&self, name: &str) -> Result<(), ClientError> {
        self.send_ok(Request::Start {
            name: name.to_string(),
        })
        .await
    }

    /// Stop every runner; returns once all loops have exited
    pub async fn stop_all(&self) -> Result<(), ClientError> {
        self.send_ok_waiting(Request::StopAll).await
    }

    pub async fn stop(&self, name: &str) -> Result<(), ClientError> {
        self.send_ok(Request::Stop {
            name: name.to_string(),
        })
        .await
    }

    pub async fn abort_all(&self) -> Result<(), ClientError> {
        self.send_ok_waiting(Request::AbortAll).await
    }

    pub async fn abort(&self, name: &str) -> Result<(), ClientError> {
        self.send_ok(Request::Abort {
            name: name.to_string(),
        })
        .await
    }

    /// Queue a run regardless of the trigger
    pub async fn force(&self, name: &str) -> Result<(), ClientError> {
        self.send_ok(Request::Force {
            name: name.to_string(),
        })
        .await
    }

    /// Withdraw queued, not yet admitted runs; returns how many were removed
    pub async fn cancel_pending(&self, name: &str) -> Result<usize, ClientError> {
        match self
            .send(Request::CancelPending {
                name: name.to_string(),
            })
            .await?
        {
            Response::Cancelled { removed } => Ok(removed),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Block until the runner's loop has exited
    pub async fn wait_for_exit(&self, name: &str) -> Result<(), ClientError> {
        self.send_ok_waiting(Request::WaitForExit {
            name: name.to_string(),
        })
        .await
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

fn expect_ok(response: Response) -> Result<(), ClientError> {
    match response {
        Response::Ok => Ok(()),
        Response::Error { message } => Err(ClientError::Rejected(message)),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
