// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local world-size resolution for `--nproc_per_node`.

use std::path::Path;

use thiserror::Error;

/// Invalid `--nproc_per_node` values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NprocError {
    #[error("gpu workers requested but no devices are available")]
    NoGpus,

    #[error("unsupported nproc_per_node value: {0}")]
    Unsupported(String),
}

/// Resolve `N | cpu | gpu | auto` into a worker count.
///
/// `auto` prefers GPUs when any are present, falling back to CPU count.
pub fn determine_local_world_size(nproc_per_node: &str) -> Result<u32, NprocError> {
    if let Ok(n) = nproc_per_node.parse::<u32>() {
        if n == 0 {
            return Err(NprocError::Unsupported(nproc_per_node.to_string()));
        }
        tracing::info!(nproc_per_node = n, "using explicit worker count");
        return Ok(n);
    }

    let num_proc = match nproc_per_node {
        "cpu" => num_cpus::get() as u32,
        "gpu" => {
            let gpus = device_count();
            if gpus == 0 {
                return Err(NprocError::NoGpus);
            }
            gpus
        }
        "auto" => {
            let gpus = device_count();
            if gpus > 0 {
                gpus
            } else {
                num_cpus::get() as u32
            }
        }
        other => return Err(NprocError::Unsupported(other.to_string())),
    };

    tracing::info!(nproc_per_node, num_proc, "resolved worker count");
    Ok(num_proc)
}

/// Number of GPU devices on this node, counted from `/dev/nvidia<N>`.
pub fn device_count() -> u32 {
    device_count_in(Path::new("/dev"))
}

fn device_count_in(dev: &Path) -> u32 {
    let Ok(entries) = std::fs::read_dir(dev) else { return 0 };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.strip_prefix("nvidia")
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        })
        .count() as u32
}

#[cfg(test)]
#[path = "nproc_tests.rs"]
mod tests;
