// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint codec registry.
//!
//! Maps a type tag (the suffix after the last `.` in a checkpoint name) to
//! a saver/loader/deleter triple. Concrete codecs are plugins; this crate
//! only ships the `bytes` passthrough and never inspects codec internals.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Transform applied to checkpoint payloads on save or load.
pub type CodecFn = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, CodecError> + Send + Sync>;

/// Cleanup hook invoked when a checkpoint of this type is deleted.
pub type DeleteFn = Arc<dyn Fn(&str) -> Result<(), CodecError> + Send + Sync>;

/// Codec failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no codec registered for type tag: {0}")]
    UnknownTag(String),

    #[error("codec {tag} already registered")]
    AlreadyRegistered { tag: String },

    #[error("codec failure: {0}")]
    Failed(String),
}

/// A saver/loader/deleter triple for one type tag.
#[derive(Clone)]
pub struct CkptCodec {
    pub save: CodecFn,
    pub load: CodecFn,
    pub delete: DeleteFn,
}

impl CkptCodec {
    /// The identity codec: bytes in, bytes out, delete is a no-op.
    pub fn passthrough() -> Self {
        Self {
            save: Arc::new(|data| Ok(data.to_vec())),
            load: Arc::new(|data| Ok(data.to_vec())),
            delete: Arc::new(|_name| Ok(())),
        }
    }
}

/// Registry of codecs by type tag.
pub struct CodecRegistry {
    codecs: HashMap<String, CkptCodec>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self { codecs: HashMap::new() }
    }

    /// Registry with the built-in `bytes` passthrough codec.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // A fresh registry cannot already hold the name.
        let _ = registry.register("bytes", CkptCodec::passthrough());
        registry
    }

    pub fn register(&mut self, tag: &str, codec: CkptCodec) -> Result<(), CodecError> {
        if self.codecs.contains_key(tag) {
            return Err(CodecError::AlreadyRegistered { tag: tag.to_string() });
        }
        self.codecs.insert(tag.to_string(), codec);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Result<&CkptCodec, CodecError> {
        self.codecs.get(tag).ok_or_else(|| CodecError::UnknownTag(tag.to_string()))
    }

    /// The type tag conveyed by a checkpoint name, if any.
    pub fn type_tag(ckpt_name: &str) -> Option<&str> {
        ckpt_name.rsplit_once('.').map(|(_, tag)| tag).filter(|tag| !tag.is_empty())
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
