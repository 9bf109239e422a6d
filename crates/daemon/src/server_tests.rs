// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cadence_core::{
    ConfigError, FakeProcessor, Processor, ProcessorBinding, ProcessorState, RunnerOptions,
};
use std::time::Duration;

fn context(processors: &[FakeProcessor]) -> ServerContext {
    let processors = processors.to_vec();
    let manager = ProcessorManager::with_options(
        move || -> Result<Vec<ProcessorBinding>, ConfigError> {
            Ok(processors
                .iter()
                .map(|p| {
                    let processor: Arc<dyn Processor> = Arc::new(p.clone());
                    ProcessorBinding::new(processor, None)
                })
                .collect())
        },
        RunnerOptions {
            poll_interval: Duration::from_millis(5),
        },
    );
    ServerContext {
        manager: Arc::new(manager),
        start_time: Instant::now(),
        shutdown_requested: Arc::new(Notify::new()),
    }
}

#[tokio::test]
async fn ping_and_hello() {
    let ctx = context(&[]);
    assert_eq!(handle_request(&ctx, Request::Ping).await, Response::Pong);
    assert_eq!(
        handle_request(
            &ctx,
            Request::Hello {
                version: "0.0.0".to_string()
            }
        )
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn status_reports_every_processor() {
    let ctx = context(&[FakeProcessor::new("a"), FakeProcessor::new("b")]);

    match handle_request(&ctx, Request::Status).await {
        Response::Status {
            processors, queue, ..
        } => {
            let names: Vec<&str> = processors.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
            assert!(processors.iter().all(|p| p.state == ProcessorState::Stopped));
            assert!(queue.is_empty());
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn start_force_and_stop() {
    let a = FakeProcessor::new("a");
    let ctx = context(&[a.clone()]);

    let start = Request::Start {
        name: "a".to_string(),
    };
    assert_eq!(handle_request(&ctx, start).await, Response::Ok);
    let force = Request::Force {
        name: "a".to_string(),
    };
    assert_eq!(handle_request(&ctx, force).await, Response::Ok);

    let deadline = Instant::now() + Duration::from_secs(5);
    while a.calls().start == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(a.calls().start, 1);

    assert_eq!(handle_request(&ctx, Request::StopAll).await, Response::Ok);
    assert_eq!(
        ctx.manager.status().unwrap()[0].state,
        ProcessorState::Stopped
    );
}

#[tokio::test]
async fn cancel_pending_reports_removed() {
    let ctx = context(&[FakeProcessor::new("a")]);
    let request = Request::CancelPending {
        name: "a".to_string(),
    };
    assert_eq!(
        handle_request(&ctx, request).await,
        Response::Cancelled { removed: 0 }
    );
}

#[tokio::test]
async fn unknown_processor_is_an_error_response() {
    let ctx = context(&[FakeProcessor::new("a")]);
    let request = Request::Abort {
        name: "zzz".to_string(),
    };
    match handle_request(&ctx, request).await {
        Response::Error { message } => assert!(message.contains("zzz")),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_notifies_main_loop() {
    let ctx = context(&[]);
    let notified = Arc::clone(&ctx.shutdown_requested);

    assert_eq!(
        handle_request(&ctx, Request::Shutdown).await,
        Response::ShuttingDown
    );
    tokio::time::timeout(Duration::from_secs(1), notified.notified())
        .await
        .unwrap();
}

#[tokio::test]
async fn connection_round_trip() {
    let ctx = context(&[]);
    let (client, server) = UnixStream::pair().unwrap();
    let handler = tokio::spawn(handle_connection(ctx, server));

    let (mut reader, mut writer) = client.into_split();
    let data = protocol::encode(&Request::Ping).unwrap();
    protocol::write_message(&mut writer, &data).await.unwrap();
    let bytes = protocol::read_message(&mut reader).await.unwrap();
    let response: Response = protocol::decode(&bytes).unwrap();

    assert_eq!(response, Response::Pong);
    handler.await.unwrap().unwrap();
}

#[tokio::test]
async fn closed_connection_is_not_an_error() {
    let ctx = context(&[]);
    let (client, server) = UnixStream::pair().unwrap();
    drop(client);
    handle_connection(ctx, server).await.unwrap();
}
