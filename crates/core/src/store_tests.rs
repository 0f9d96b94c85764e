// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::mem::MemStore;
use std::thread;

#[test]
fn get_all_reads_indexed_keys() {
    let store = MemStore::new();
    store.set("data0", b"a").unwrap();
    store.set("data1", b"b").unwrap();
    store.set("data2", b"c").unwrap();

    let values = get_all(&store, "data", 3).unwrap();
    assert_eq!(values, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn synchronize_gathers_every_agents_blob() {
    let store = MemStore::new();
    let world_size = 4u32;

    let handles: Vec<_> = (0..world_size)
        .map(|rank| {
            let store = store.clone();
            thread::spawn(move || {
                let data = format!("agent-{rank}");
                synchronize(
                    &store,
                    data.as_bytes(),
                    rank,
                    world_size,
                    "sync/",
                    Duration::from_secs(5),
                )
                .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let gathered = handle.join().unwrap();
        let expected: Vec<Vec<u8>> =
            (0..world_size).map(|r| format!("agent-{r}").into_bytes()).collect();
        assert_eq!(gathered, expected);
    }
}

#[test]
fn barrier_releases_all_participants() {
    let store = MemStore::new();
    let handles: Vec<_> = (0..3u32)
        .map(|rank| {
            let store = store.clone();
            thread::spawn(move || {
                barrier(&store, rank, 3, "barrier/", Duration::from_secs(5))
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
}

#[test]
fn barrier_times_out_when_a_peer_is_missing() {
    let store = MemStore::new();
    let result = barrier(&store, 0, 2, "lonely/", Duration::from_millis(30));
    assert!(matches!(result, Err(StoreError::Timeout(_))));
}

#[test]
fn master_addr_port_round_trips() {
    let store = MemStore::new();
    set_master_addr_port(&store, Some("trainer-0"), Some(29500)).unwrap();
    let (addr, port) = get_master_addr_port(&store).unwrap();
    assert_eq!(addr, "trainer-0");
    assert_eq!(port, 29500);
}

#[test]
fn master_addr_port_defaults_are_filled_in() {
    let store = MemStore::new();
    set_master_addr_port(&store, None, None).unwrap();
    let (addr, port) = get_master_addr_port(&store).unwrap();
    assert!(!addr.is_empty());
    assert!(port > 0);
}

#[test]
fn bad_master_port_is_rejected() {
    let store = MemStore::new();
    store.set("MASTER_ADDR", b"host").unwrap();
    store.set("MASTER_PORT", b"not-a-port").unwrap();
    assert!(matches!(
        get_master_addr_port(&store),
        Err(StoreError::BadValue { .. })
    ));
}
