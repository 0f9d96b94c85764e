// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking checkpoint client.
//!
//! One outstanding request per connection: every call writes a single
//! frame and reads a single response frame. ERROR responses surface as
//! [`ClientError::Server`] carrying the server's message.

use std::collections::BTreeMap;
use std::net::{TcpStream, ToSocketAddrs};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lattice_wire::{
    read_message_blocking, write_message_blocking, CheckpointMessage, ProtocolError, RequestType,
};

use crate::server::ACK;

/// Advisory lock owner metadata, compared by the caller after ACQUIRE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub node_id: String,
}

impl LockInfo {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self { node_id: node_id.into() }
    }
}

/// Checkpoint client failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("failed to connect to checkpoint service: {0}")]
    Connect(std::io::Error),

    #[error("checkpoint service error: {0}")]
    Server(String),

    #[error("unexpected response type {got}, expected {expected}")]
    UnexpectedResponse { expected: RequestType, got: RequestType },

    #[error("undecodable response body: {0}")]
    BadBody(String),
}

/// Blocking connection to the checkpoint service.
pub struct CkptClient {
    stream: TcpStream,
}

impl CkptClient {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        Ok(Self { stream })
    }

    fn request(
        &mut self,
        msg: CheckpointMessage,
        expected: RequestType,
    ) -> Result<CheckpointMessage, ClientError> {
        write_message_blocking(&mut self.stream, &msg)?;
        let response = read_message_blocking(&mut self.stream)?;
        match response.req_type {
            t if t == expected => Ok(response),
            RequestType::Error => {
                Err(ClientError::Server(String::from_utf8_lossy(&response.body).into_owned()))
            }
            got => Err(ClientError::UnexpectedResponse { expected, got }),
        }
    }

    /// Liveness check.
    pub fn ping(&mut self, job_id: &str) -> Result<(), ClientError> {
        let msg = CheckpointMessage::new(RequestType::Ping, job_id, "", "", Vec::new());
        let response = self.request(msg, RequestType::Ping)?;
        if response.body == ACK {
            Ok(())
        } else {
            Err(ClientError::BadBody("ping response was not an ACK".to_string()))
        }
    }

    /// All checkpoint names stored for `job_id`, keyed by uid.
    pub fn list(&mut self, job_id: &str) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        let msg = CheckpointMessage::new(RequestType::List, job_id, "", "", Vec::new());
        let response = self.request(msg, RequestType::List)?;
        serde_json::from_slice(&response.body).map_err(|e| ClientError::BadBody(e.to_string()))
    }

    pub fn save(
        &mut self,
        job_id: &str,
        uid: &str,
        ckpt_name: &str,
        data: &[u8],
    ) -> Result<(), ClientError> {
        let msg = CheckpointMessage::new(RequestType::Save, job_id, uid, ckpt_name, data);
        self.request(msg, RequestType::Save).map(|_| ())
    }

    pub fn load(
        &mut self,
        job_id: &str,
        uid: &str,
        ckpt_name: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let msg = CheckpointMessage::new(RequestType::Load, job_id, uid, ckpt_name, Vec::new());
        self.request(msg, RequestType::Load).map(|response| response.body)
    }

    pub fn delete(&mut self, job_id: &str, uid: &str, ckpt_name: &str) -> Result<(), ClientError> {
        let msg = CheckpointMessage::new(RequestType::Del, job_id, uid, ckpt_name, Vec::new());
        self.request(msg, RequestType::Del).map(|_| ())
    }

    /// Acquire an advisory lock; returns the owner that holds the lock
    /// after the call. Compare `node_id` against your own to learn whether
    /// you won.
    pub fn acquire(
        &mut self,
        job_id: &str,
        uid: &str,
        lock_name: &str,
        owner: &LockInfo,
    ) -> Result<LockInfo, ClientError> {
        let body = serde_json::to_vec(owner).map_err(|e| ClientError::BadBody(e.to_string()))?;
        let msg = CheckpointMessage::new(RequestType::Acquire, job_id, uid, lock_name, body);
        let response = self.request(msg, RequestType::Acquire)?;
        serde_json::from_slice(&response.body).map_err(|e| ClientError::BadBody(e.to_string()))
    }

    pub fn release(&mut self, job_id: &str, uid: &str, lock_name: &str) -> Result<(), ClientError> {
        let msg = CheckpointMessage::new(RequestType::Release, job_id, uid, lock_name, Vec::new());
        self.request(msg, RequestType::Release).map(|_| ())
    }
}
