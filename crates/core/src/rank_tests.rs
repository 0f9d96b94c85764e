// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::mem::MemStore;
use crate::rendezvous::LocalRendezvous;
use crate::worker::WorkerSpec;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

fn spec(role: &str, local_world_size: u32) -> WorkerSpec {
    WorkerSpec::new(
        "generic",
        role,
        local_world_size,
        "/usr/bin/env",
        Arc::new(LocalRendezvous::new("rank-test")),
        Duration::from_secs(1),
    )
    .unwrap()
}

fn info(role: &str, rank: u32, local_world_size: u32) -> RoleInstanceInfo {
    RoleInstanceInfo::new(role, rank, local_world_size)
}

#[test]
fn role_info_serde_round_trips() {
    let original = info("trainer", 3, 8);
    let encoded = serde_json::to_vec(&original).unwrap();
    let decoded: RoleInstanceInfo = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn global_ranks_are_dense_and_disjoint_for_uniform_peers() {
    let store = MemStore::new();
    let world_size = 3u32;
    let local = 2u32;

    let handles: Vec<_> = (0..world_size)
        .map(|rank| {
            let store = store.clone();
            thread::spawn(move || {
                let spec = spec("trainer", local);
                determine_global_ranks(&store, rank, world_size, &spec).unwrap()
            })
        })
        .collect();

    let mut all_ranks = BTreeSet::new();
    for (agent_rank, handle) in handles.into_iter().enumerate() {
        let (_, ws, ranks) = handle.join().unwrap();
        assert_eq!(ws, world_size * local);
        assert_eq!(ranks.len(), local as usize);
        assert_eq!(ranks[0], agent_rank as u32 * local);
        for rank in ranks {
            assert!(all_ranks.insert(rank), "duplicate global rank {rank}");
        }
    }
    let expected: BTreeSet<u32> = (0..world_size * local).collect();
    assert_eq!(all_ranks, expected);
}

#[test]
fn global_ranks_cover_heterogeneous_local_sizes() {
    let store = MemStore::new();
    let sizes = [3u32, 1, 2];

    let handles: Vec<_> = sizes
        .iter()
        .enumerate()
        .map(|(rank, &local)| {
            let store = store.clone();
            thread::spawn(move || {
                let spec = spec("trainer", local);
                determine_global_ranks(&store, rank as u32, 3, &spec).unwrap()
            })
        })
        .collect();

    let mut all_ranks = BTreeSet::new();
    for handle in handles {
        let (_, ws, ranks) = handle.join().unwrap();
        assert_eq!(ws, 6);
        for rank in ranks {
            assert!(all_ranks.insert(rank));
        }
    }
    let expected: BTreeSet<u32> = (0..6).collect();
    assert_eq!(all_ranks, expected);
}

#[test]
fn role_ranks_are_dense_within_each_role() {
    // Two trainers and two parameter servers, interleaved by group rank.
    let infos = vec![
        info("trainer", 0, 2),
        info("ps", 1, 1),
        info("trainer", 2, 2),
        info("ps", 3, 1),
    ];

    let (trainer_ws, first_trainer) =
        determine_role_ranks(&infos, &info("trainer", 0, 2)).unwrap();
    assert_eq!(trainer_ws, 4);
    assert_eq!(first_trainer, vec![0, 1]);

    let (_, second_trainer) = determine_role_ranks(&infos, &info("trainer", 2, 2)).unwrap();
    assert_eq!(second_trainer, vec![2, 3]);

    let (ps_ws, first_ps) = determine_role_ranks(&infos, &info("ps", 1, 1)).unwrap();
    assert_eq!(ps_ws, 2);
    assert_eq!(first_ps, vec![0]);

    let (_, second_ps) = determine_role_ranks(&infos, &info("ps", 3, 1)).unwrap();
    assert_eq!(second_ps, vec![1]);
}

#[test]
fn role_rank_assignment_is_a_bijection() {
    let infos = vec![
        info("a", 0, 2),
        info("b", 1, 3),
        info("a", 2, 1),
        info("b", 3, 1),
    ];

    for role in ["a", "b"] {
        let mut seen = BTreeSet::new();
        let mut role_ws = None;
        for peer in infos.iter().filter(|i| i.role == role) {
            let (ws, ranks) = determine_role_ranks(&infos, peer).unwrap();
            role_ws = Some(ws);
            for rank in ranks {
                assert!(rank < ws);
                assert!(seen.insert(rank), "duplicate role rank {rank} in {role}");
            }
        }
        let ws = role_ws.unwrap();
        assert_eq!(seen, (0..ws).collect::<BTreeSet<u32>>());
    }
}

#[test]
fn duplicate_role_rank_is_a_protocol_violation() {
    let infos = vec![info("trainer", 0, 1), info("trainer", 0, 2)];
    let result = determine_role_ranks(&infos, &info("trainer", 0, 1));
    assert!(matches!(
        result,
        Err(RankError::DuplicateRoleRank { role, rank: 0 }) if role == "trainer"
    ));
}

#[test]
fn unknown_descriptor_is_rejected() {
    let infos = vec![info("trainer", 0, 1)];
    let result = determine_role_ranks(&infos, &info("other", 5, 1));
    assert!(matches!(result, Err(RankError::MissingSelf)));
}

#[test]
fn undecodable_peer_blob_surfaces_as_error() {
    let store = MemStore::new();
    store.set("torchelastic/role_info1", b"not json").unwrap();
    let spec = spec("trainer", 1);
    let result = determine_global_ranks(&store, 0, 2, &spec);
    assert!(matches!(result, Err(RankError::Decode(_))));
}
