// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core data model for the elastic training agent.
//!
//! Worker specs and groups, rank assignment, the rendezvous and KV-store
//! interfaces the agent consumes, and the framework worker registry.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod clock;
mod error;
pub mod macros;
mod mem;
mod net;
mod rank;
mod registry;
mod rendezvous;
mod std_stream;
mod store;
mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ConfigError, RankError, RegistryError, RendezvousError, StoreError};
pub use mem::MemStore;
pub use net::{fq_hostname, free_port};
pub use rank::{
    determine_global_ranks, determine_role_ranks, share_and_gather, RoleInstanceInfo,
    ROLE_INFO_PREFIX,
};
pub use registry::{
    InfoGatherer, WorkerFactory, WorkerInfo, WorkerRegistry, GENERIC_FRAMEWORK,
    PYTORCH_FRAMEWORK,
};
pub use rendezvous::{
    LocalRendezvous, RdzvFactory, RdzvRegistry, RendezvousHandler, RendezvousInfo,
    RendezvousParameters, DEFAULT_RDZV_TIMEOUT,
};
pub use std_stream::{Std, StdParseError, StdSpec};
pub use store::{
    barrier, get_all, get_master_addr_port, set_master_addr_port, synchronize, Store,
    DEFAULT_BARRIER_TIMEOUT,
};
pub use worker::{Worker, WorkerGroup, WorkerSpec, WorkerState, DEFAULT_ROLE};
