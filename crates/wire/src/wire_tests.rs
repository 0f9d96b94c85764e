// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn msg() -> CheckpointMessage {
    CheckpointMessage::new(
        RequestType::Save,
        "job-1",
        "uid-1",
        "model.pt",
        vec![0u8, 1, 2, 255],
    )
}

#[test]
fn encode_decode_round_trips() {
    let original = msg();
    let decoded = decode(&encode(&original)).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn empty_fields_round_trip() {
    let original = CheckpointMessage::new(RequestType::Ping, "", "", "", Vec::new());
    assert_eq!(decode(&encode(&original)).unwrap(), original);
}

#[test]
fn decode_rejects_unknown_request_type() {
    let mut payload = encode(&msg());
    payload[0] = 42;
    assert!(matches!(decode(&payload), Err(ProtocolError::BadRequestType(42))));
}

#[test]
fn decode_rejects_truncated_payloads() {
    let payload = encode(&msg());
    for len in [0, 1, 3, payload.len() - 1] {
        assert!(
            matches!(decode(&payload[..len]), Err(ProtocolError::Truncated)),
            "length {len} should be truncated"
        );
    }
}

#[test]
fn decode_rejects_trailing_garbage() {
    let mut payload = encode(&msg());
    payload.push(0);
    assert!(matches!(decode(&payload), Err(ProtocolError::Truncated)));
}

#[test]
fn decode_rejects_invalid_utf8_keys() {
    // job_id length 1 with a stray continuation byte.
    let mut payload = vec![RequestType::Ping as u8];
    payload.extend_from_slice(&1u32.to_be_bytes());
    payload.push(0xFF);
    for _ in 0..3 {
        payload.extend_from_slice(&0u32.to_be_bytes());
    }
    assert!(matches!(decode(&payload), Err(ProtocolError::BadString)));
}

#[tokio::test]
async fn async_read_write_round_trips() {
    let original = msg();
    let mut buffer = Vec::new();
    write_message(&mut buffer, &original).await.unwrap();

    let mut reader = buffer.as_slice();
    let decoded = read_message(&mut reader).await.unwrap();
    assert_eq!(decoded, original);
}

#[tokio::test]
async fn async_read_reports_closed_connections() {
    let mut reader: &[u8] = &[];
    assert!(matches!(read_message(&mut reader).await, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn oversized_frames_are_rejected_on_read() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&(u32::MAX).to_be_bytes());
    let mut reader = buffer.as_slice();
    assert!(matches!(
        read_message(&mut reader).await,
        Err(ProtocolError::FrameTooLarge(_))
    ));
}

#[test]
fn blocking_read_write_round_trips() {
    let original = msg();
    let mut buffer = Vec::new();
    write_message_blocking(&mut buffer, &original).unwrap();

    let mut reader = buffer.as_slice();
    let decoded = read_message_blocking(&mut reader).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn blocking_read_reports_closed_connections() {
    let mut reader: &[u8] = &[];
    assert!(matches!(
        read_message_blocking(&mut reader),
        Err(ProtocolError::ConnectionClosed)
    ));
}
