// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use cadence_core::ProcessorState;

fn status_response() -> Response {
    Response::Status {
        uptime_secs: 3600,
        processors: vec![RunnerStatus {
            name: "backup".to_string(),
            state: ProcessorState::Running,
            next_fire_time: "2004-12-01T10:00:00".parse().ok(),
            admitted: false,
            pending: true,
        }],
        queue: vec!["report".to_string(), "backup".to_string()],
    }
}

#[test]
fn encode_decode_roundtrip_request() {
    let request = Request::Force {
        name: "backup".to_string(),
    };

    let encoded = encode(&request).expect("encode failed");
    let decoded: Request = decode(&encoded).expect("decode failed");

    assert_eq!(request, decoded);
}

#[test]
fn encode_decode_roundtrip_status() {
    let response = status_response();

    let encoded = encode(&response).expect("encode failed");
    let decoded: Response = decode(&encoded).expect("decode failed");

    assert_eq!(response, decoded);
}

#[test]
fn requests_are_tagged_by_type() {
    let encoded = encode(&Request::StopAll).expect("encode failed");
    assert_eq!(encoded, br#"{"type":"StopAll"}"#);

    let decoded: Request = decode(br#"{"type":"Abort","name":"backup"}"#).expect("decode failed");
    assert_eq!(
        decoded,
        Request::Abort {
            name: "backup".to_string()
        }
    );
}

#[test]
fn processor_state_is_lowercase_on_the_wire() {
    let json = String::from_utf8(encode(&status_response()).expect("encode failed")).unwrap();
    assert!(json.contains(r#""state":"running""#), "{}", json);
}

#[test]
fn fire_time_is_sent_as_naive_timestamp() {
    let json = String::from_utf8(encode(&status_response()).expect("encode failed")).unwrap();
    assert!(json.contains(r#""next_fire_time":"2004-12-01T10:00:00""#), "{}", json);
}

#[test]
fn unknown_request_is_rejected() {
    let result: Result<Request, _> = decode(br#"{"type":"Reboot"}"#);
    assert!(matches!(result, Err(ProtocolError::Json(_))));
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original)
        .await
        .expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data)
        .await
        .expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn oversized_prefix_is_rejected() {
    let prefix = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes();
    let mut cursor = std::io::Cursor::new(prefix.to_vec());
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
}

#[tokio::test]
async fn truncated_body_is_an_io_error() {
    let mut bytes = 10u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"abc");
    let mut cursor = std::io::Cursor::new(bytes);
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::Io(_))));
}

#[tokio::test]
async fn request_roundtrip_over_duplex() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    let data = encode(&Request::Hello {
        version: "0.1.0".to_string(),
    })
    .expect("encode failed");
    write_message(&mut client, &data).await.expect("write failed");
    let request = read_request(&mut server, DEFAULT_TIMEOUT)
        .await
        .expect("read failed");
    assert_eq!(
        request,
        Request::Hello {
            version: "0.1.0".to_string()
        }
    );

    write_response(&mut server, &Response::Pong, DEFAULT_TIMEOUT)
        .await
        .expect("write failed");
    let bytes = read_message(&mut client).await.expect("read failed");
    assert_eq!(decode::<Response>(&bytes).expect("decode failed"), Response::Pong);
}

#[tokio::test]
async fn read_request_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let result = read_request(&mut server, std::time::Duration::from_millis(20)).await;
    assert!(matches!(result, Err(ProtocolError::Timeout)));
}
