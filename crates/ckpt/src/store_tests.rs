// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::thread;

#[test]
fn save_then_load_returns_the_exact_bytes() {
    let store = CkptStore::new();
    store.save("job", "uid", "model.pt", vec![1, 2, 3]).unwrap();
    assert_eq!(store.load("job", "uid", "model.pt").unwrap(), vec![1, 2, 3]);
}

#[test]
fn save_replaces_and_tracks_total_bytes() {
    let store = CkptStore::new();
    store.save("job", "uid", "model.pt", vec![0; 100]).unwrap();
    assert_eq!(store.total_bytes(), 100);
    store.save("job", "uid", "model.pt", vec![0; 40]).unwrap();
    assert_eq!(store.total_bytes(), 40);
    assert_eq!(store.load("job", "uid", "model.pt").unwrap().len(), 40);
}

#[test]
fn load_missing_checkpoint_errors() {
    let store = CkptStore::new();
    assert_eq!(
        store.load("job", "uid", "nope"),
        Err(CkptError::CheckpointNotFound)
    );
}

#[test]
fn delete_removes_and_errors_when_missing() {
    let store = CkptStore::new();
    store.save("job", "uid", "model.pt", vec![9; 10]).unwrap();
    store.delete("job", "uid", "model.pt").unwrap();
    assert_eq!(store.total_bytes(), 0);
    assert_eq!(store.delete("job", "uid", "model.pt"), Err(CkptError::CheckpointNotFound));
    assert_eq!(store.load("job", "uid", "model.pt"), Err(CkptError::CheckpointNotFound));
}

#[test]
fn oversize_save_is_rejected() {
    let store = CkptStore::with_limits(16, 1024);
    let result = store.save("job", "uid", "big.pt", vec![0; 17]);
    assert_eq!(result, Err(CkptError::TooLarge { size: 17, limit: 16 }));
    assert_eq!(store.total_bytes(), 0);
}

#[test]
fn list_groups_names_by_uid() {
    let store = CkptStore::new();
    store.save("job", "uid-a", "model.pt", vec![1]).unwrap();
    store.save("job", "uid-a", "opt.pt", vec![2]).unwrap();
    store.save("job", "uid-b", "data.pt", vec![3]).unwrap();
    store.save("other-job", "uid-c", "x.pt", vec![4]).unwrap();

    let listing = store.list("job");
    assert_eq!(listing.len(), 2);
    assert_eq!(listing["uid-a"], vec!["model.pt", "opt.pt"]);
    assert_eq!(listing["uid-b"], vec!["data.pt"]);

    assert!(store.list("unknown").is_empty());
}

#[test]
fn acquire_installs_the_first_owner() {
    let store = CkptStore::new();
    let winner = store.acquire("job", "uid", "lock.model.pt", b"node-1".to_vec());
    assert_eq!(winner, b"node-1");
    // A later caller sees the original owner unchanged.
    let holder = store.acquire("job", "uid", "lock.model.pt", b"node-2".to_vec());
    assert_eq!(holder, b"node-1");
}

#[test]
fn release_frees_the_lock_for_a_new_owner() {
    let store = CkptStore::new();
    store.acquire("job", "uid", "lock.model.pt", b"node-1".to_vec());
    store.release("job", "uid", "lock.model.pt").unwrap();
    assert_eq!(
        store.release("job", "uid", "lock.model.pt"),
        Err(CkptError::LockNotFound)
    );
    let holder = store.acquire("job", "uid", "lock.model.pt", b"node-2".to_vec());
    assert_eq!(holder, b"node-2");
}

#[test]
fn concurrent_acquires_agree_on_one_owner() {
    let store = Arc::new(CkptStore::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.acquire("job", "uid", "lock.model.pt", format!("node-{i}").into_bytes())
            })
        })
        .collect();

    let owners: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &owners[0];
    assert!(owners.iter().all(|owner| owner == first));
}

#[test]
fn keys_are_isolated_per_job_and_uid() {
    let store = CkptStore::new();
    store.save("job-1", "uid", "model.pt", vec![1]).unwrap();
    assert_eq!(store.load("job-2", "uid", "model.pt"), Err(CkptError::CheckpointNotFound));
    assert_eq!(store.load("job-1", "other", "model.pt"), Err(CkptError::CheckpointNotFound));
}
