// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the core data model.

use thiserror::Error;

/// Invalid worker spec or worker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("local_world_size must be > 0")]
    ZeroLocalWorldSize,

    #[error("monitor_interval must be > 0")]
    ZeroMonitorInterval,

    #[error("entrypoint must not be empty")]
    EmptyEntrypoint,

    #[error("missing required worker env vars: {keys:?}")]
    MissingRequiredVars { keys: Vec<String> },
}

/// Errors from a KV store backing rendezvous.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timed out waiting for key: {0}")]
    Timeout(String),

    #[error("value for key {key} is not valid: {reason}")]
    BadValue { key: String, reason: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from rendezvous handling.
#[derive(Debug, Error)]
pub enum RendezvousError {
    #[error("unknown rendezvous backend: {0}")]
    UnknownBackend(String),

    #[error("rendezvous backend already registered: {0}")]
    AlreadyRegistered(String),

    #[error("rendezvous handler is shut down")]
    Closed,

    #[error("invalid rendezvous endpoint: {0}")]
    BadEndpoint(String),

    #[error("rendezvous backend error: {0}")]
    Backend(String),
}

/// Errors during rank assignment.
#[derive(Debug, Error)]
pub enum RankError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to decode peer role info: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("duplicate (role, group_rank) pair: ({role}, {rank})")]
    DuplicateRoleRank { role: String, rank: u32 },

    #[error("own role info not present in gathered peer set")]
    MissingSelf,
}

/// Errors from the worker creator registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown framework: {0}")]
    UnknownFramework(String),

    #[error("{0} already registered for framework {1}")]
    AlreadyRegistered(&'static str, String),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
