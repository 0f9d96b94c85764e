// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint request/response message type.

use std::fmt;

/// Request type carried by every checkpoint message.
///
/// Responses reuse the request's type; failures use `Error` with a
/// human-readable body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    Ping = 0,
    List = 1,
    Save = 2,
    Load = 3,
    Del = 4,
    Acquire = 5,
    Release = 6,
    Error = 101,
}

impl RequestType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RequestType::Ping),
            1 => Some(RequestType::List),
            2 => Some(RequestType::Save),
            3 => Some(RequestType::Load),
            4 => Some(RequestType::Del),
            5 => Some(RequestType::Acquire),
            6 => Some(RequestType::Release),
            101 => Some(RequestType::Error),
            _ => None,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::Ping => "PING",
            RequestType::List => "LIST",
            RequestType::Save => "SAVE",
            RequestType::Load => "LOAD",
            RequestType::Del => "DEL",
            RequestType::Acquire => "ACQUIRE",
            RequestType::Release => "RELEASE",
            RequestType::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A single checkpoint protocol message.
///
/// `body` is opaque; its meaning depends on `req_type` (checkpoint bytes
/// for SAVE/LOAD, owner metadata for ACQUIRE, a JSON listing for LIST
/// responses, a human-readable message for ERROR).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointMessage {
    pub req_type: RequestType,
    pub job_id: String,
    pub uid: String,
    pub ckpt_name: String,
    pub body: Vec<u8>,
}

impl CheckpointMessage {
    pub fn new(
        req_type: RequestType,
        job_id: impl Into<String>,
        uid: impl Into<String>,
        ckpt_name: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            req_type,
            job_id: job_id.into(),
            uid: uid.into(),
            ckpt_name: ckpt_name.into(),
            body: body.into(),
        }
    }

    /// An ERROR response echoing the request's key.
    pub fn error(job_id: &str, uid: &str, ckpt_name: &str, message: &str) -> Self {
        Self::new(RequestType::Error, job_id, uid, ckpt_name, message.as_bytes())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
