// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end checkpoint service scenarios.

use lattice_ckpt::{serve, CkptClient, ClientError, LockInfo, ServerConfig};

fn start_server() -> (tokio::runtime::Runtime, lattice_ckpt::CkptServer, std::net::SocketAddr) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt
        .block_on(serve(ServerConfig { port: 0, ..ServerConfig::default() }))
        .unwrap();
    let addr = server.local_addr();
    (rt, server, addr)
}

/// Checkpoint round-trip with an advisory lock: acquire, save, load,
/// release, and a failing second release.
#[test]
fn checkpoint_round_trip_with_lock() {
    let (_rt, _server, addr) = start_server();
    let mut client = CkptClient::connect(addr).unwrap();

    client.ping("J").unwrap();

    // The winner's owner metadata comes back unchanged.
    let owner = client.acquire("J", "U", "lock.model", &LockInfo::new("N1")).unwrap();
    assert_eq!(owner.node_id, "N1");

    let payload = b"opaque model bytes".to_vec();
    client.save("J", "U", "model.pt", &payload).unwrap();
    assert_eq!(client.load("J", "U", "model.pt").unwrap(), payload);

    client.release("J", "U", "lock.model").unwrap();
    match client.release("J", "U", "lock.model") {
        Err(ClientError::Server(message)) => assert_eq!(message, "Lock not found"),
        other => panic!("expected a server error, got {other:?}"),
    }
}

/// A held lock is returned to later acquirers until released.
#[test]
fn lock_is_first_writer_wins() {
    let (_rt, _server, addr) = start_server();

    let mut first = CkptClient::connect(addr).unwrap();
    let mut second = CkptClient::connect(addr).unwrap();

    let w = first.acquire("J", "U", "lock.opt", &LockInfo::new("N1")).unwrap();
    assert_eq!(w.node_id, "N1");

    let holder = second.acquire("J", "U", "lock.opt", &LockInfo::new("N2")).unwrap();
    assert_eq!(holder.node_id, "N1");

    first.release("J", "U", "lock.opt").unwrap();
    let now = second.acquire("J", "U", "lock.opt", &LockInfo::new("N2")).unwrap();
    assert_eq!(now.node_id, "N2");
}

/// LIST groups checkpoint names by uid; DEL removes entries.
#[test]
fn list_and_delete_across_uids() {
    let (_rt, _server, addr) = start_server();
    let mut client = CkptClient::connect(addr).unwrap();

    client.save("J", "U1", "model.pt", b"m1").unwrap();
    client.save("J", "U1", "opt.pt", b"o1").unwrap();
    client.save("J", "U2", "model.pt", b"m2").unwrap();

    let listing = client.list("J").unwrap();
    assert_eq!(listing["U1"], vec!["model.pt", "opt.pt"]);
    assert_eq!(listing["U2"], vec!["model.pt"]);

    client.delete("J", "U1", "opt.pt").unwrap();
    let listing = client.list("J").unwrap();
    assert_eq!(listing["U1"], vec!["model.pt"]);

    match client.load("J", "U1", "opt.pt") {
        Err(ClientError::Server(message)) => assert_eq!(message, "Checkpoint not found"),
        other => panic!("expected a server error, got {other:?}"),
    }
}

/// Oversized saves are rejected with an error response, not a crash.
#[test]
fn oversize_save_is_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt
        .block_on(serve(ServerConfig {
            port: 0,
            max_ckpt_bytes: 64,
            ..ServerConfig::default()
        }))
        .unwrap();
    let mut client = CkptClient::connect(server.local_addr()).unwrap();

    let err = client.save("J", "U", "big.pt", &[0u8; 65]).unwrap_err();
    assert!(matches!(err, ClientError::Server(message) if message.contains("exceeds")));

    // The connection and service survive.
    client.ping("J").unwrap();
}
