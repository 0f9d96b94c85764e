// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::server::{serve, ServerConfig};
use crate::LockInfo;

/// Multi-thread runtime kept alive so server tasks run while the blocking
/// client drives requests from the test thread.
fn start_server() -> (tokio::runtime::Runtime, crate::CkptServer, std::net::SocketAddr) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt
        .block_on(serve(ServerConfig { port: 0, ..ServerConfig::default() }))
        .unwrap();
    let addr = server.local_addr();
    (rt, server, addr)
}

fn group(addr: std::net::SocketAddr) -> StateManagerGroup {
    let client = CkptClient::connect(addr).unwrap();
    StateManagerGroup::new(client, "job-1", "uid-1", Arc::new(CodecRegistry::with_defaults()))
}

#[test]
fn update_get_delete_are_local_until_save() {
    let (_rt, _server, addr) = start_server();
    let mut manager = group(addr);

    manager.update("step", b"42".to_vec());
    assert_eq!(manager.get("step"), Some(b"42".as_slice()));
    assert!(manager.get("missing").is_none());

    let mut names = manager.names();
    names.sort_unstable();
    assert_eq!(names, vec!["step"]);
}

#[test]
fn save_then_load_round_trips_named_states() {
    let (_rt, _server, addr) = start_server();

    let mut writer = group(addr);
    writer.update("model.bytes", b"weights".to_vec());
    writer.update("step", b"7".to_vec());
    writer.save().unwrap();

    let mut reader = group(addr);
    reader.load().unwrap();
    assert_eq!(reader.get("model.bytes"), Some(b"weights".as_slice()));
    assert_eq!(reader.get("step"), Some(b"7".as_slice()));
}

#[test]
fn load_skips_lock_entries() {
    let (_rt, _server, addr) = start_server();

    let mut client = CkptClient::connect(addr).unwrap();
    client
        .acquire("job-1", "uid-1", "lock.model.bytes", &LockInfo::new("node-1"))
        .unwrap();
    client.save("job-1", "uid-1", "model.bytes", b"w").unwrap();

    let mut manager = group(addr);
    manager.load().unwrap();
    assert_eq!(manager.get("model.bytes"), Some(b"w".as_slice()));
    assert!(manager.get("lock.model.bytes").is_none());
}

#[test]
fn load_with_nothing_stored_clears_local_state() {
    let (_rt, _server, addr) = start_server();
    let mut manager = group(addr);
    manager.update("step", b"1".to_vec());
    manager.load().unwrap();
    assert!(manager.names().is_empty());
}

#[test]
fn delete_removes_remote_and_local_state() {
    let (_rt, _server, addr) = start_server();
    let mut manager = group(addr);
    manager.update("model.bytes", b"w".to_vec());
    manager.save().unwrap();

    manager.delete("model.bytes").unwrap();
    assert!(manager.get("model.bytes").is_none());

    let mut reader = group(addr);
    reader.load().unwrap();
    assert!(reader.get("model.bytes").is_none());

    // Deleting a never-saved name is not an error.
    manager.delete("ghost.bytes").unwrap();
}

#[test]
fn unknown_tag_surfaces_a_codec_error() {
    let (_rt, _server, addr) = start_server();
    let mut manager = group(addr);
    manager.update("model.pt", b"w".to_vec());
    assert!(matches!(
        manager.save(),
        Err(ManagerError::Codec(CodecError::UnknownTag(tag))) if tag == "pt"
    ));
}
