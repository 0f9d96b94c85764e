// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side state manager group.
//!
//! Workers register named state values through the explicit
//! `update(name, value)` API and round-trip the whole set through the
//! checkpoint service under their `(job, uid)` key. Codecs are selected by
//! the name's type-tag suffix; untagged names pass through unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::client::{CkptClient, ClientError};
use crate::registry::{CodecError, CodecRegistry};
use crate::store::LOCK_PREFIX;

/// State manager failures.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Named state values for one `(job, uid)`, synced via the checkpoint
/// service.
///
/// One instance per process is a construction contract of the launcher;
/// the manager itself carries no global state.
pub struct StateManagerGroup {
    client: CkptClient,
    job_id: String,
    uid: String,
    registry: Arc<CodecRegistry>,
    states: HashMap<String, Vec<u8>>,
}

impl StateManagerGroup {
    pub fn new(
        client: CkptClient,
        job_id: impl Into<String>,
        uid: impl Into<String>,
        registry: Arc<CodecRegistry>,
    ) -> Self {
        Self {
            client,
            job_id: job_id.into(),
            uid: uid.into(),
            registry,
            states: HashMap::new(),
        }
    }

    /// Record a named state value to be included in the next `save`.
    pub fn update(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.states.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.states.get(name).map(Vec::as_slice)
    }

    /// Drop a state locally and delete its checkpoint.
    pub fn delete(&mut self, name: &str) -> Result<(), ManagerError> {
        self.states.remove(name);
        if let Some(tag) = CodecRegistry::type_tag(name) {
            (self.registry.get(tag)?.delete)(name)?;
        }
        match self.client.delete(&self.job_id, &self.uid, name) {
            Ok(()) | Err(ClientError::Server(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.states.keys().map(String::as_str).collect()
    }

    /// Push every recorded state to the checkpoint service.
    pub fn save(&mut self) -> Result<(), ManagerError> {
        for (name, value) in &self.states {
            let encoded = match CodecRegistry::type_tag(name) {
                Some(tag) => (self.registry.get(tag)?.save)(value)?,
                None => value.clone(),
            };
            self.client.save(&self.job_id, &self.uid, name, &encoded)?;
        }
        Ok(())
    }

    /// Replace local state with everything stored for this `(job, uid)`.
    ///
    /// Lock entries are skipped; they are coordination metadata, not state.
    pub fn load(&mut self) -> Result<(), ManagerError> {
        let listing = self.client.list(&self.job_id)?;
        let Some(names) = listing.get(&self.uid) else {
            self.states.clear();
            return Ok(());
        };

        let mut loaded = HashMap::new();
        for name in names {
            if name.starts_with(LOCK_PREFIX) {
                continue;
            }
            let raw = self.client.load(&self.job_id, &self.uid, name)?;
            let decoded = match CodecRegistry::type_tag(name) {
                Some(tag) => (self.registry.get(tag)?.load)(&raw)?,
                None => raw,
            };
            loaded.insert(name.clone(), decoded);
        }
        self.states = loaded;
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
