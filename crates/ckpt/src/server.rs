// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint request router and worker pool.
//!
//! A TCP front-end accepts client connections (one outstanding request per
//! connection) and fans decoded requests over a bounded channel to a fixed
//! pool of worker tasks. Workers execute handlers against the shared store
//! and reply through a oneshot back to the owning connection.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lattice_wire::{read_message, write_message, CheckpointMessage, ProtocolError, RequestType};

use crate::store::{CkptStore, DEFAULT_MAX_CKPT_BYTES, DEFAULT_MAX_TOTAL_BYTES};

/// Conventional checkpoint service port.
pub const DEFAULT_PORT: u16 = 5555;

/// Default size of the worker pool.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Positive acknowledgement body.
pub const ACK: &[u8] = b"ACK";

/// Checkpoint server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub num_workers: usize,
    pub max_ckpt_bytes: usize,
    pub max_total_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            num_workers: DEFAULT_NUM_WORKERS,
            max_ckpt_bytes: DEFAULT_MAX_CKPT_BYTES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

/// Errors starting the server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind checkpoint service port: {0}")]
    Bind(std::io::Error),
}

struct Job {
    request: CheckpointMessage,
    reply: oneshot::Sender<CheckpointMessage>,
}

/// Handle to a running checkpoint server.
pub struct CkptServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl CkptServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for CkptServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Bind the service and spawn the router and worker pool.
pub async fn serve(config: ServerConfig) -> Result<CkptServer, ServeError> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await.map_err(ServeError::Bind)?;
    let addr = listener.local_addr().map_err(ServeError::Bind)?;
    let store = Arc::new(CkptStore::with_limits(config.max_ckpt_bytes, config.max_total_bytes));
    let shutdown = CancellationToken::new();

    let (tx, rx) = mpsc::channel::<Job>(config.num_workers * 2);
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..config.num_workers {
        let store = Arc::clone(&store);
        let rx = Arc::clone(&rx);
        let token = shutdown.clone();
        tokio::spawn(async move {
            worker_routine(worker_id, store, rx, token).await;
        });
    }

    let token = shutdown.clone();
    tokio::spawn(async move {
        accept_loop(listener, tx, token).await;
    });

    info!(%addr, workers = config.num_workers, "checkpoint service listening");
    Ok(CkptServer { addr, shutdown })
}

async fn accept_loop(listener: TcpListener, tx: mpsc::Sender<Job>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    debug!(%peer, "checkpoint client connected");
                    let tx = tx.clone();
                    let token = shutdown.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, tx, token).await;
                    });
                }
                Err(e) => error!(error = %e, "accept error"),
            },
        }
    }
}

/// Serve one client connection: read a frame, dispatch, reply, repeat.
async fn handle_connection(
    mut stream: TcpStream,
    tx: mpsc::Sender<Job>,
    shutdown: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            _ = shutdown.cancelled() => return,
            request = read_message(&mut stream) => request,
        };

        let response = match request {
            Ok(request) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if tx.send(Job { request, reply: reply_tx }).await.is_err() {
                    return;
                }
                match reply_rx.await {
                    Ok(response) => response,
                    Err(_) => return,
                }
            }
            Err(ProtocolError::ConnectionClosed) => {
                debug!("checkpoint client disconnected");
                return;
            }
            Err(ProtocolError::Io(e)) => {
                warn!(error = %e, "checkpoint connection read failed");
                return;
            }
            // Bad input never takes the server down; answer and carry on.
            Err(e) => CheckpointMessage::error("", "", "", &e.to_string()),
        };

        if let Err(e) = write_message(&mut stream, &response).await {
            warn!(error = %e, "checkpoint connection write failed");
            return;
        }
    }
}

async fn worker_routine(
    worker_id: usize,
    store: Arc<CkptStore>,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    shutdown: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = shutdown.cancelled() => return,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else { return };

        debug!(worker_id, req_type = %job.request.req_type, "handling checkpoint request");
        let response = handle_request(&store, job.request);
        let _ = job.reply.send(response);
    }
}

/// Execute one request against the store and build the response.
pub fn handle_request(store: &CkptStore, msg: CheckpointMessage) -> CheckpointMessage {
    let CheckpointMessage { req_type, job_id, uid, ckpt_name, body } = msg;
    match req_type {
        RequestType::Ping => {
            CheckpointMessage::new(RequestType::Ping, job_id, uid, ckpt_name, ACK)
        }
        RequestType::List => {
            let listing = store.list(&job_id);
            let encoded = serde_json::to_vec(&listing).unwrap_or_default();
            CheckpointMessage::new(RequestType::List, job_id, uid, ckpt_name, encoded)
        }
        RequestType::Save => match store.save(&job_id, &uid, &ckpt_name, body) {
            Ok(()) => CheckpointMessage::new(RequestType::Save, job_id, uid, ckpt_name, ACK),
            Err(e) => CheckpointMessage::error(&job_id, &uid, &ckpt_name, &e.to_string()),
        },
        RequestType::Load => match store.load(&job_id, &uid, &ckpt_name) {
            Ok(data) => CheckpointMessage::new(RequestType::Load, job_id, uid, ckpt_name, data),
            Err(e) => CheckpointMessage::error(&job_id, &uid, &ckpt_name, &e.to_string()),
        },
        RequestType::Del => match store.delete(&job_id, &uid, &ckpt_name) {
            Ok(()) => CheckpointMessage::new(RequestType::Del, job_id, uid, ckpt_name, ACK),
            Err(e) => CheckpointMessage::error(&job_id, &uid, &ckpt_name, &e.to_string()),
        },
        RequestType::Acquire => {
            let holder = store.acquire(&job_id, &uid, &ckpt_name, body);
            CheckpointMessage::new(RequestType::Acquire, job_id, uid, ckpt_name, holder)
        }
        RequestType::Release => match store.release(&job_id, &uid, &ckpt_name) {
            Ok(()) => CheckpointMessage::new(RequestType::Release, job_id, uid, ckpt_name, ACK),
            Err(e) => CheckpointMessage::error(&job_id, &uid, &ckpt_name, &e.to_string()),
        },
        RequestType::Error => {
            CheckpointMessage::error(&job_id, &uid, &ckpt_name, "Invalid request type")
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
