// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! KV-store interface obtained from rendezvous, plus the barrier and
//! synchronize helpers built on top of it.

use std::time::Duration;

use crate::error::StoreError;
use crate::net::{fq_hostname, free_port};

/// Default timeout for barrier-style synchronization between agents.
pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(300);

/// Store keys for the master address/port published by group rank 0.
const MASTER_ADDR_KEY: &str = "MASTER_ADDR";
const MASTER_PORT_KEY: &str = "MASTER_PORT";

/// Key-value store shared by all agents of one rendezvous round.
///
/// `get` blocks until the key has been published by some agent or the
/// store timeout elapses. Implementations are backed by an external
/// consistent store (e.g. etcd) or, for single-node runs and tests, by
/// [`crate::MemStore`].
pub trait Store: Send + Sync {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Blocking read: waits for the key up to the store timeout.
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Atomically set `key` to `desired` if its current value is `expected`
    /// (an empty `expected` matches a missing key). Returns the value the
    /// key holds after the call.
    fn compare_and_set(
        &self,
        key: &str,
        expected: &[u8],
        desired: &[u8],
    ) -> Result<Vec<u8>, StoreError>;

    /// Atomically add `delta` to the integer stored at `key` (missing keys
    /// count as 0) and return the new value.
    fn add(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    /// Block until every key in `keys` exists, up to `timeout`.
    fn wait(&self, keys: &[&str], timeout: Duration) -> Result<(), StoreError>;

    /// Non-blocking existence check for all of `keys`.
    fn check(&self, keys: &[&str]) -> Result<bool, StoreError>;

    /// Adjust the timeout used by blocking operations.
    fn set_timeout(&self, timeout: Duration);
}

/// Read the values of `{prefix}{0..size}` in index order.
pub fn get_all(store: &dyn Store, prefix: &str, size: u32) -> Result<Vec<Vec<u8>>, StoreError> {
    (0..size).map(|idx| store.get(&format!("{prefix}{idx}"))).collect()
}

/// Publish `data` under `{key_prefix}{rank}` and gather every agent's blob.
///
/// The data is not deleted afterwards, so a given `key_prefix` can only be
/// used once per store.
pub fn synchronize(
    store: &dyn Store,
    data: &[u8],
    rank: u32,
    world_size: u32,
    key_prefix: &str,
    barrier_timeout: Duration,
) -> Result<Vec<Vec<u8>>, StoreError> {
    store.set_timeout(barrier_timeout);
    store.set(&format!("{key_prefix}{rank}"), data)?;
    get_all(store, key_prefix, world_size)
}

/// A one-shot global barrier between `world_size` agents.
pub fn barrier(
    store: &dyn Store,
    rank: u32,
    world_size: u32,
    key_prefix: &str,
    barrier_timeout: Duration,
) -> Result<(), StoreError> {
    let data = rank.to_string().into_bytes();
    synchronize(store, &data, rank, world_size, key_prefix, barrier_timeout)?;
    Ok(())
}

/// Publish the master address/port for worker process groups.
///
/// Called by group rank 0 only. A missing port is replaced by a free port
/// on this host; a missing address by this host's name.
pub fn set_master_addr_port(
    store: &dyn Store,
    master_addr: Option<&str>,
    master_port: Option<u16>,
) -> Result<(), StoreError> {
    let port = match master_port {
        Some(p) => p,
        None => free_port().map_err(|e| StoreError::Backend(e.to_string()))?,
    };
    let addr = match master_addr {
        Some(a) => a.to_string(),
        None => fq_hostname(),
    };

    store.set(MASTER_ADDR_KEY, addr.as_bytes())?;
    store.set(MASTER_PORT_KEY, port.to_string().as_bytes())?;
    Ok(())
}

/// Read back the master address/port published by group rank 0.
pub fn get_master_addr_port(store: &dyn Store) -> Result<(String, u16), StoreError> {
    let addr = String::from_utf8(store.get(MASTER_ADDR_KEY)?).map_err(|e| {
        StoreError::BadValue { key: MASTER_ADDR_KEY.to_string(), reason: e.to_string() }
    })?;
    let port_raw = String::from_utf8(store.get(MASTER_PORT_KEY)?).map_err(|e| {
        StoreError::BadValue { key: MASTER_PORT_KEY.to_string(), reason: e.to_string() }
    })?;
    let port = port_raw.parse().map_err(|_| StoreError::BadValue {
        key: MASTER_PORT_KEY.to_string(),
        reason: format!("not a port number: {port_raw}"),
    })?;
    Ok((addr, port))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
