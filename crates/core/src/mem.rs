// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process KV store used by the local rendezvous backend and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::StoreError;
use crate::store::{Store, DEFAULT_BARRIER_TIMEOUT};

/// Shared in-memory [`Store`].
///
/// Clones share the same underlying map, so one instance can be handed to
/// every agent of a single-process test world.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<Inner>,
}

struct Inner {
    map: Mutex<HashMap<String, Vec<u8>>>,
    cond: Condvar,
    timeout: Mutex<Duration>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                map: Mutex::new(HashMap::new()),
                cond: Condvar::new(),
                timeout: Mutex::new(DEFAULT_BARRIER_TIMEOUT),
            }),
        }
    }

    fn timeout(&self) -> Duration {
        *self.inner.timeout.lock()
    }

    /// Block until `pred` holds on the map or the deadline passes.
    fn wait_until<F>(&self, timeout: Duration, mut pred: F) -> bool
    where
        F: FnMut(&HashMap<String, Vec<u8>>) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut map = self.inner.map.lock();
        while !pred(&map) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.inner.cond.wait_until(&mut map, deadline).timed_out() {
                return pred(&map);
            }
        }
        true
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut map = self.inner.map.lock();
        map.insert(key.to_string(), value.to_vec());
        self.inner.cond.notify_all();
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let timeout = self.timeout();
        if !self.wait_until(timeout, |map| map.contains_key(key)) {
            return Err(StoreError::Timeout(key.to_string()));
        }
        let map = self.inner.map.lock();
        map.get(key).cloned().ok_or_else(|| StoreError::Timeout(key.to_string()))
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: &[u8],
        desired: &[u8],
    ) -> Result<Vec<u8>, StoreError> {
        let mut map = self.inner.map.lock();
        match map.get(key) {
            Some(current) if current.as_slice() == expected => {
                map.insert(key.to_string(), desired.to_vec());
                self.inner.cond.notify_all();
                Ok(desired.to_vec())
            }
            Some(current) => Ok(current.clone()),
            None if expected.is_empty() => {
                map.insert(key.to_string(), desired.to_vec());
                self.inner.cond.notify_all();
                Ok(desired.to_vec())
            }
            None => Ok(expected.to_vec()),
        }
    }

    fn add(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut map = self.inner.map.lock();
        let current = match map.get(key) {
            Some(raw) => String::from_utf8(raw.clone())
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| StoreError::BadValue {
                    key: key.to_string(),
                    reason: "not an integer".to_string(),
                })?,
            None => 0,
        };
        let next = current + delta;
        map.insert(key.to_string(), next.to_string().into_bytes());
        self.inner.cond.notify_all();
        Ok(next)
    }

    fn wait(&self, keys: &[&str], timeout: Duration) -> Result<(), StoreError> {
        if self.wait_until(timeout, |map| keys.iter().all(|k| map.contains_key(*k))) {
            Ok(())
        } else {
            let missing = {
                let map = self.inner.map.lock();
                keys.iter().find(|k| !map.contains_key(**k)).map(|k| k.to_string())
            };
            Err(StoreError::Timeout(missing.unwrap_or_default()))
        }
    }

    fn check(&self, keys: &[&str]) -> Result<bool, StoreError> {
        let map = self.inner.map.lock();
        Ok(keys.iter().all(|k| map.contains_key(*k)))
    }

    fn set_timeout(&self, timeout: Duration) {
        *self.inner.timeout.lock() = timeout;
    }
}

#[cfg(test)]
#[path = "mem_tests.rs"]
mod tests;
