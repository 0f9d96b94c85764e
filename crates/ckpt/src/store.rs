// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory checkpoint map and advisory locks.
//!
//! All mutations are serialized by one mutex. ACQUIRE's check-then-act
//! runs entirely under it, so two clients can never both observe an empty
//! lock slot.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use thiserror::Error;

/// Per-checkpoint size cap (enforced).
pub const DEFAULT_MAX_CKPT_BYTES: usize = 1 << 30;

/// Total-bytes threshold guiding future eviction (tracked, not enforced).
pub const DEFAULT_MAX_TOTAL_BYTES: usize = 4 << 30;

/// Name prefix marking an entry as an advisory lock.
pub const LOCK_PREFIX: &str = "lock.";

/// Checkpoint store failures. Messages are sent verbatim to clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CkptError {
    #[error("Checkpoint not found")]
    CheckpointNotFound,

    #[error("Lock not found")]
    LockNotFound,

    #[error("Checkpoint of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Default)]
struct Inner {
    // job_id → uid → ckpt_name → blob
    jobs: HashMap<String, HashMap<String, HashMap<String, Vec<u8>>>>,
    total_bytes: usize,
}

/// In-memory map `(job, uid, name) → blob` plus advisory locks.
///
/// Contents are lost on process exit; clients are expected to persist to
/// durable storage independently.
pub struct CkptStore {
    inner: Mutex<Inner>,
    max_ckpt_bytes: usize,
    max_total_bytes: usize,
}

impl CkptStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_CKPT_BYTES, DEFAULT_MAX_TOTAL_BYTES)
    }

    pub fn with_limits(max_ckpt_bytes: usize, max_total_bytes: usize) -> Self {
        Self { inner: Mutex::new(Inner::default()), max_ckpt_bytes, max_total_bytes }
    }

    /// Insert or replace a checkpoint. Oversized blobs are rejected.
    pub fn save(
        &self,
        job_id: &str,
        uid: &str,
        ckpt_name: &str,
        data: Vec<u8>,
    ) -> Result<(), CkptError> {
        if data.len() > self.max_ckpt_bytes {
            return Err(CkptError::TooLarge { size: data.len(), limit: self.max_ckpt_bytes });
        }

        let mut inner = self.inner.lock();
        let added = data.len();
        let replaced = inner
            .jobs
            .entry(job_id.to_string())
            .or_default()
            .entry(uid.to_string())
            .or_default()
            .insert(ckpt_name.to_string(), data)
            .map(|old| old.len())
            .unwrap_or(0);
        inner.total_bytes = inner.total_bytes + added - replaced;

        if inner.total_bytes > self.max_total_bytes {
            tracing::warn!(
                total_bytes = inner.total_bytes,
                threshold = self.max_total_bytes,
                "checkpoint cache exceeds the total-bytes threshold"
            );
        }
        Ok(())
    }

    pub fn load(&self, job_id: &str, uid: &str, ckpt_name: &str) -> Result<Vec<u8>, CkptError> {
        let inner = self.inner.lock();
        inner
            .jobs
            .get(job_id)
            .and_then(|uids| uids.get(uid))
            .and_then(|ckpts| ckpts.get(ckpt_name))
            .cloned()
            .ok_or(CkptError::CheckpointNotFound)
    }

    pub fn delete(&self, job_id: &str, uid: &str, ckpt_name: &str) -> Result<(), CkptError> {
        let mut inner = self.inner.lock();
        let removed = inner
            .jobs
            .get_mut(job_id)
            .and_then(|uids| uids.get_mut(uid))
            .and_then(|ckpts| ckpts.remove(ckpt_name))
            .ok_or(CkptError::CheckpointNotFound)?;
        inner.total_bytes -= removed.len();
        Ok(())
    }

    /// Snapshot of all checkpoint names for a job, keyed by uid.
    pub fn list(&self, job_id: &str) -> BTreeMap<String, Vec<String>> {
        let inner = self.inner.lock();
        let Some(uids) = inner.jobs.get(job_id) else { return BTreeMap::new() };
        uids.iter()
            .map(|(uid, ckpts)| {
                let mut names: Vec<String> = ckpts.keys().cloned().collect();
                names.sort();
                (uid.clone(), names)
            })
            .collect()
    }

    /// First-writer-wins advisory lock.
    ///
    /// Installs `owner` if the lock is absent; either way, returns the
    /// owner metadata that holds the lock after the call. Callers compare
    /// owner identity to learn whether they won.
    pub fn acquire(&self, job_id: &str, uid: &str, lock_name: &str, owner: Vec<u8>) -> Vec<u8> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let slot = inner
            .jobs
            .entry(job_id.to_string())
            .or_default()
            .entry(uid.to_string())
            .or_default();
        match slot.get(lock_name) {
            Some(holder) => holder.clone(),
            None => {
                let size = owner.len();
                slot.insert(lock_name.to_string(), owner.clone());
                inner.total_bytes += size;
                owner
            }
        }
    }

    pub fn release(&self, job_id: &str, uid: &str, lock_name: &str) -> Result<(), CkptError> {
        let mut inner = self.inner.lock();
        let removed = inner
            .jobs
            .get_mut(job_id)
            .and_then(|uids| uids.get_mut(uid))
            .and_then(|ckpts| ckpts.remove(lock_name))
            .ok_or(CkptError::LockNotFound)?;
        inner.total_bytes -= removed.len();
        Ok(())
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}

impl Default for CkptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
