// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for daemon client behavior.

use super::{ClientError, DaemonClient};
use cadence_core::{ProcessorState, RunnerStatus};
use cadence_daemon::protocol::{self, ProtocolError};
use cadence_daemon::{Request, Response};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

/// Answer a single connection with `response`, returning the request seen
fn serve_once(socket: &Path, response: Response) -> JoinHandle<Request> {
    serve_after(socket, response, Duration::ZERO)
}

/// Like `serve_once`, holding the response back for `delay`
fn serve_after(socket: &Path, response: Response, delay: Duration) -> JoinHandle<Request> {
    let listener = UnixListener::bind(socket).unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        let bytes = protocol::read_message(&mut reader).await.unwrap();
        let request: Request = protocol::decode(&bytes).unwrap();
        tokio::time::sleep(delay).await;
        let data = protocol::encode(&response).unwrap();
        protocol::write_message(&mut writer, &data).await.unwrap();
        request
    })
}

#[test]
fn connect_without_socket_reports_not_running() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("missing.sock");

    let result = DaemonClient::connect(&socket);
    assert!(matches!(result, Err(ClientError::DaemonNotRunning(path)) if path == socket));
}

#[tokio::test]
async fn force_sends_processor_name() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let server = serve_once(&socket, Response::Ok);

    let client = DaemonClient::connect(&socket).unwrap();
    client.force("backup").await.unwrap();

    assert_eq!(
        server.await.unwrap(),
        Request::Force {
            name: "backup".to_string()
        }
    );
}

#[tokio::test]
async fn error_response_becomes_rejected() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let _server = serve_once(
        &socket,
        Response::Error {
            message: "unknown processor: nope".to_string(),
        },
    );

    let client = DaemonClient::connect(&socket).unwrap();
    let err = client.stop("nope").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref m) if m == "unknown processor: nope"));
    assert_eq!(err.to_string(), "unknown processor: nope");
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let _server = serve_once(&socket, Response::Pong);

    let client = DaemonClient::connect(&socket).unwrap();
    let err = client.cancel_pending("a").await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedResponse));
}

#[tokio::test]
async fn cancel_pending_returns_removed_count() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let _server = serve_once(&socket, Response::Cancelled { removed: 2 });

    let client = DaemonClient::connect(&socket).unwrap();
    assert_eq!(client.cancel_pending("a").await.unwrap(), 2);
}

#[tokio::test]
async fn status_unpacks_snapshot() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let runner = RunnerStatus {
        name: "a".to_string(),
        state: ProcessorState::Running,
        next_fire_time: None,
        admitted: true,
        pending: false,
    };
    let _server = serve_once(
        &socket,
        Response::Status {
            uptime_secs: 42,
            processors: vec![runner.clone()],
            queue: vec!["a".to_string()],
        },
    );

    let client = DaemonClient::connect(&socket).unwrap();
    let status = client.status().await.unwrap();
    assert_eq!(status.uptime_secs, 42);
    assert_eq!(status.processors, vec![runner]);
    assert_eq!(status.queue, vec!["a"]);
}

#[tokio::test]
async fn shutdown_accepts_shutting_down() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let _server = serve_once(&socket, Response::ShuttingDown);

    let client = DaemonClient::connect(&socket).unwrap();
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn stale_socket_file_is_an_io_error() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    std::fs::write(&socket, "").unwrap();

    let client = DaemonClient::connect(&socket).unwrap();
    assert!(matches!(client.ping().await, Err(ClientError::Io(_))));
}

const SHORT: Duration = Duration::from_millis(50);
const SLOW_REPLY: Duration = Duration::from_millis(300);

#[tokio::test]
async fn slow_reply_to_plain_request_times_out() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let _server = serve_after(&socket, Response::Ok, SLOW_REPLY);

    let client = DaemonClient::connect(&socket)
        .unwrap()
        .with_timeouts(SHORT, Duration::from_secs(10));
    let err = client.stop("a").await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(ProtocolError::Timeout)));
}

#[tokio::test]
async fn stop_all_waits_past_ipc_timeout() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let server = serve_after(&socket, Response::Ok, SLOW_REPLY);

    let client = DaemonClient::connect(&socket)
        .unwrap()
        .with_timeouts(SHORT, Duration::from_secs(10));
    client.stop_all().await.unwrap();
    assert_eq!(server.await.unwrap(), Request::StopAll);
}

#[tokio::test]
async fn abort_all_waits_past_ipc_timeout() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let server = serve_after(&socket, Response::Ok, SLOW_REPLY);

    let client = DaemonClient::connect(&socket)
        .unwrap()
        .with_timeouts(SHORT, Duration::from_secs(10));
    client.abort_all().await.unwrap();
    assert_eq!(server.await.unwrap(), Request::AbortAll);
}

#[tokio::test]
async fn stop_all_gives_up_after_wait_timeout() {
    let temp = tempdir().unwrap();
    let socket = temp.path().join("d.sock");
    let _server = serve_after(&socket, Response::Ok, SLOW_REPLY);

    let client = DaemonClient::connect(&socket)
        .unwrap()
        .with_timeouts(SHORT, SHORT);
    let err = client.stop_all().await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(ProtocolError::Timeout)));
}
