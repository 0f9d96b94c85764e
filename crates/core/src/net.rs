// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small network helpers for master address/port selection.

use std::io;
use std::net::TcpListener;

/// Reserve a free TCP port on localhost by briefly binding it.
///
/// The socket is closed before the port is returned, so another process may
/// still grab the port before the caller binds it.
pub fn free_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// This host's name, for use as the default master address.
pub fn fq_hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}
