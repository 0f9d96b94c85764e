// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing and binary codec.
//!
//! Payload layout: `u8` request type, then `job_id`, `uid`, `ckpt_name`,
//! `body`, each prefixed by a `u32` big-endian length. The frame itself is
//! prefixed by its `u32` big-endian payload length.

use std::io::{Read, Write};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::{CheckpointMessage, RequestType};

/// Upper bound on a frame payload: the 1 GiB checkpoint cap plus headroom
/// for keys and headers.
pub const MAX_FRAME_BYTES: usize = (1 << 30) + (1 << 20);

/// Errors from encoding, decoding, or framed I/O.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("Unknown request type: {0}")]
    BadRequestType(u8),

    #[error("Truncated message")]
    Truncated,

    #[error("Field is not valid UTF-8")]
    BadString,
}

/// Encode a message payload (without the outer frame length).
pub fn encode(msg: &CheckpointMessage) -> Vec<u8> {
    let mut payload = Vec::with_capacity(
        1 + 16 + msg.job_id.len() + msg.uid.len() + msg.ckpt_name.len() + msg.body.len(),
    );
    payload.push(msg.req_type as u8);
    for field in [msg.job_id.as_bytes(), msg.uid.as_bytes(), msg.ckpt_name.as_bytes()] {
        payload.extend_from_slice(&(field.len() as u32).to_be_bytes());
        payload.extend_from_slice(field);
    }
    payload.extend_from_slice(&(msg.body.len() as u32).to_be_bytes());
    payload.extend_from_slice(&msg.body);
    payload
}

/// Decode a message payload produced by [`encode`].
pub fn decode(payload: &[u8]) -> Result<CheckpointMessage, ProtocolError> {
    let mut cursor = Cursor { payload, pos: 0 };
    let type_byte = cursor.take_u8()?;
    let req_type =
        RequestType::from_u8(type_byte).ok_or(ProtocolError::BadRequestType(type_byte))?;
    let job_id = cursor.take_string()?;
    let uid = cursor.take_string()?;
    let ckpt_name = cursor.take_string()?;
    let body = cursor.take_bytes()?;
    if cursor.pos != payload.len() {
        return Err(ProtocolError::Truncated);
    }
    Ok(CheckpointMessage { req_type, job_id, uid, ckpt_name, body })
}

struct Cursor<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take_u8(&mut self) -> Result<u8, ProtocolError> {
        let byte = *self.payload.get(self.pos).ok_or(ProtocolError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn take_len(&mut self) -> Result<usize, ProtocolError> {
        let end = self.pos + 4;
        let raw = self.payload.get(self.pos..end).ok_or(ProtocolError::Truncated)?;
        let mut len = [0u8; 4];
        len.copy_from_slice(raw);
        self.pos = end;
        Ok(u32::from_be_bytes(len) as usize)
    }

    fn take_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.take_len()?;
        let end = self.pos.checked_add(len).ok_or(ProtocolError::Truncated)?;
        let raw = self.payload.get(self.pos..end).ok_or(ProtocolError::Truncated)?;
        self.pos = end;
        Ok(raw.to_vec())
    }

    fn take_string(&mut self) -> Result<String, ProtocolError> {
        String::from_utf8(self.take_bytes()?).map_err(|_| ProtocolError::BadString)
    }
}

/// Read one framed message from an async reader.
pub async fn read_message<R>(reader: &mut R) -> Result<CheckpointMessage, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    decode(&payload)
}

/// Write one framed message to an async writer.
pub async fn write_message<W>(
    writer: &mut W,
    msg: &CheckpointMessage,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = encode(msg);
    if payload.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message from a blocking reader (client side).
pub fn read_message_blocking<R: Read>(reader: &mut R) -> Result<CheckpointMessage, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    decode(&payload)
}

/// Write one framed message to a blocking writer (client side).
pub fn write_message_blocking<W: Write>(
    writer: &mut W,
    msg: &CheckpointMessage,
) -> Result<(), ProtocolError> {
    let payload = encode(msg);
    if payload.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
