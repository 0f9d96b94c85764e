// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wrapper around a single spawned worker process.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::errors::ProcError;

/// One spawned child plus its redirect file paths.
///
/// The child inherits the agent's environment with the per-worker entries
/// layered on top. Streams without a redirect path are inherited from the
/// agent.
pub struct SubprocessHandler {
    pub child: Child,
    pub stdout_path: Option<PathBuf>,
    pub stderr_path: Option<PathBuf>,
}

impl SubprocessHandler {
    pub fn spawn(
        local_rank: usize,
        entrypoint: &str,
        args: &[String],
        env: &HashMap<String, String>,
        stdout_path: Option<&Path>,
        stderr_path: Option<&Path>,
    ) -> Result<Self, ProcError> {
        let stdout = redirect(stdout_path, local_rank)?;
        let stderr = redirect(stderr_path, local_rank)?;

        let child = Command::new(entrypoint)
            .args(args)
            .envs(env)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| ProcError::Spawn { local_rank, source })?;

        Ok(Self {
            child,
            stdout_path: stdout_path.map(Path::to_path_buf),
            stderr_path: stderr_path.map(Path::to_path_buf),
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Deliver `signal` to the child. A dead child is not an error.
    pub fn send_signal(&self, signal: Signal) {
        let pid = Pid::from_raw(self.child.id() as i32);
        if let Err(e) = kill(pid, signal) {
            tracing::debug!(pid = %pid, signal = %signal, error = %e, "signal delivery failed");
        }
    }
}

fn redirect(path: Option<&Path>, local_rank: usize) -> Result<Stdio, ProcError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| ProcError::Spawn {
                local_rank,
                source,
            })?;
            Ok(Stdio::from(file))
        }
        None => Ok(Stdio::inherit()),
    }
}
