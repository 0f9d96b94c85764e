// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global and role rank assignment from gathered peer descriptors.
//!
//! Each agent publishes a [`RoleInstanceInfo`] to the rendezvous store,
//! gathers every peer's descriptor, and derives its workers' global ranks
//! from the prefix sum of `local_world_size` over lower group ranks. Role
//! ranks apply the same prefix sum restricted to the agents sharing a role.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RankError;
use crate::store::{synchronize, Store};
use crate::worker::WorkerSpec;

/// Key prefix for the role-info gather round.
pub const ROLE_INFO_PREFIX: &str = "torchelastic/role_info";

/// Descriptor each agent publishes during rank assignment.
///
/// Ordered lexicographically by role, then numerically by agent rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInstanceInfo {
    pub role: String,
    pub rank: u32,
    pub local_world_size: u32,
}

impl RoleInstanceInfo {
    pub fn new(role: impl Into<String>, rank: u32, local_world_size: u32) -> Self {
        Self { role: role.into(), rank, local_world_size }
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.role.cmp(&other.role).then(self.rank.cmp(&other.rank))
    }

    /// Index range `[start, end)` of `role` within a sorted descriptor list.
    fn role_boundaries(sorted: &[RoleInstanceInfo], role: &str) -> (usize, usize) {
        let start = sorted.partition_point(|info| info.role.as_str() < role);
        let end = sorted.partition_point(|info| info.role.as_str() <= role);
        (start, end)
    }
}

/// Publish this agent's descriptor and gather all peers', indexed by
/// group rank.
pub fn share_and_gather(
    store: &dyn Store,
    group_rank: u32,
    group_world_size: u32,
    spec: &WorkerSpec,
) -> Result<Vec<RoleInstanceInfo>, RankError> {
    let own = RoleInstanceInfo::new(&spec.role, group_rank, spec.local_world_size);
    let encoded = serde_json::to_vec(&own)?;
    let blobs = synchronize(
        store,
        &encoded,
        group_rank,
        group_world_size,
        ROLE_INFO_PREFIX,
        Duration::from_secs(300),
    )
    .map_err(RankError::Store)?;

    blobs
        .iter()
        .map(|blob| serde_json::from_slice(blob).map_err(RankError::Decode))
        .collect()
}

/// `(world_size, ranks)` for the descriptor at `idx`, considering only the
/// slice `[start, end)` of `infos`.
fn get_ranks(
    infos: &[RoleInstanceInfo],
    idx: usize,
    start: usize,
    end: usize,
) -> (u32, Vec<u32>) {
    let mut prefix_sum = 0;
    let mut total_sum = 0;
    for (i, info) in infos.iter().enumerate().take(end).skip(start) {
        if idx > i {
            prefix_sum += info.local_world_size;
        }
        total_sum += info.local_world_size;
    }
    let own = infos[idx].local_world_size;
    (total_sum, (prefix_sum..prefix_sum + own).collect())
}

/// Gather peer descriptors and compute this agent's global worker ranks.
///
/// Returns the gathered descriptors (indexed by group rank), the worker
/// world size, and the global ranks owned by this agent.
pub fn determine_global_ranks(
    store: &dyn Store,
    group_rank: u32,
    group_world_size: u32,
    spec: &WorkerSpec,
) -> Result<(Vec<RoleInstanceInfo>, u32, Vec<u32>), RankError> {
    let infos = share_and_gather(store, group_rank, group_world_size, spec)?;
    let (world_size, global_ranks) = get_ranks(&infos, group_rank as usize, 0, infos.len());
    Ok((infos, world_size, global_ranks))
}

/// Compute role-scoped ranks for `own` among the gathered descriptors.
///
/// Returns `(role_world_size, role_ranks)`. A duplicate `(role, rank)` pair
/// in the descriptor set is a protocol violation and yields an error.
pub fn determine_role_ranks(
    infos: &[RoleInstanceInfo],
    own: &RoleInstanceInfo,
) -> Result<(u32, Vec<u32>), RankError> {
    let mut sorted = infos.to_vec();
    sorted.sort_by(|a, b| a.compare(b));

    for pair in sorted.windows(2) {
        if pair[0].compare(&pair[1]) == Ordering::Equal {
            return Err(RankError::DuplicateRoleRank {
                role: pair[0].role.clone(),
                rank: pair[0].rank,
            });
        }
    }

    let (start, end) = RoleInstanceInfo::role_boundaries(&sorted, &own.role);
    let pos = sorted
        .iter()
        .position(|info| info.compare(own) == Ordering::Equal)
        .ok_or(RankError::MissingSelf)?;

    Ok(get_ranks(&sorted, pos, start, end))
}

#[cfg(test)]
#[path = "rank_tests.rs"]
mod tests;
