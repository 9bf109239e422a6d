// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::Instant;

use cadence_core::{ManagerError, ProcessorManager};
use cadence_daemon::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};
use tokio::net::UnixStream;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::lifecycle::DaemonState;

/// What a connection handler needs from the daemon
#[derive(Clone)]
pub struct ServerContext {
    pub manager: Arc<ProcessorManager>,
    pub start_time: Instant,
    pub shutdown_requested: Arc<Notify>,
}

impl ServerContext {
    pub fn new(daemon: &DaemonState) -> Self {
        Self {
            manager: Arc::clone(&daemon.manager),
            start_time: daemon.start_time,
            shutdown_requested: Arc::clone(&daemon.shutdown_requested),
        }
    }
}

/// Handle a single client connection
pub async fn handle_connection(ctx: ServerContext, stream: UnixStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(&ctx, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let uptime_secs = ctx.start_time.elapsed().as_secs();
            respond(ctx, move |m| {
                Ok(Response::Status {
                    uptime_secs,
                    processors: m.status()?,
                    queue: m.queued()?,
                })
            })
            .await
        }

        Request::StartAll => respond(ctx, |m| m.start_all().map(|_| Response::Ok)).await,
        Request::Start { name } => respond(ctx, move |m| m.start(&name).map(|_| Response::Ok)).await,
        Request::StopAll => respond(ctx, |m| m.stop_all().map(|_| Response::Ok)).await,
        Request::Stop { name } => respond(ctx, move |m| m.stop(&name).map(|_| Response::Ok)).await,
        Request::Force { name } => respond(ctx, move |m| m.force(&name).map(|_| Response::Ok)).await,
        Request::CancelPending { name } => {
            respond(ctx, move |m| {
                m.cancel_pending(&name)
                    .map(|removed| Response::Cancelled { removed })
            })
            .await
        }
        Request::WaitForExit { name } => {
            respond(ctx, move |m| m.wait_for_exit(&name).map(|_| Response::Ok)).await
        }
        Request::AbortAll => respond(ctx, |m| m.abort_all().map(|_| Response::Ok)).await,
        Request::Abort { name } => respond(ctx, move |m| m.abort(&name).map(|_| Response::Ok)).await,

        Request::Shutdown => {
            info!("Shutdown requested via IPC");
            ctx.shutdown_requested.notify_one();
            Response::ShuttingDown
        }
    }
}

/// Run a manager call on the blocking pool; errors become `Response::Error`
async fn respond<F>(ctx: &ServerContext, call: F) -> Response
where
    F: FnOnce(&ProcessorManager) -> Result<Response, ManagerError> + Send + 'static,
{
    let manager = Arc::clone(&ctx.manager);
    match tokio::task::spawn_blocking(move || call(&manager)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => Response::Error {
            message: e.to_string(),
        },
        Err(e) => Response::Error {
            message: format!("manager call failed: {}", e),
        },
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
