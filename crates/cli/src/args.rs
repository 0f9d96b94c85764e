// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launcher flags. Every flag can also be set through its
//! `LATTICE_<UPPERCASE>` environment variable equivalent.

use std::collections::HashMap;

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "lattice", about = "Elastic training agent launcher")]
pub struct Args {
    /// ML framework used by the workers (selects the env-var protocol)
    #[arg(long, env = "LATTICE_FRAMEWORK", default_value = "generic")]
    pub framework: String,

    /// Number of nodes, or an elastic range in MIN:MAX form
    #[arg(long, env = "LATTICE_NNODES")]
    pub nnodes: String,

    /// Workers per node: a number, or cpu|gpu|auto
    #[arg(long = "nproc_per_node", env = "LATTICE_NPROC_PER_NODE", default_value = "1")]
    pub nproc_per_node: String,

    /// Backend used for rendezvous
    #[arg(long = "rdzv_backend", env = "LATTICE_RDZV_BACKEND", default_value = "etcd")]
    pub rdzv_backend: String,

    /// Rendezvous backend endpoint
    #[arg(
        long = "rdzv_client_service_host",
        env = "LATTICE_RDZV_CLIENT_SERVICE_HOST",
        default_value = "lattice-rdzv-client.lattice"
    )]
    pub rdzv_client_service_host: String,

    /// Rendezvous backend port
    #[arg(long = "rdzv_client_service_port", env = "LATTICE_RDZV_CLIENT_SERVICE_PORT", default_value = "2379")]
    pub rdzv_client_service_port: String,

    /// User-defined job id
    #[arg(long = "rdzv_id", env = "LATTICE_RDZV_ID")]
    pub rdzv_id: String,

    /// Additional rendezvous configuration (key1=value1,key2=value2,...)
    #[arg(long = "rdzv_conf", env = "LATTICE_RDZV_CONF", default_value = "")]
    pub rdzv_conf: String,

    /// Metric pushgateway endpoint
    #[arg(
        long = "metric_pushgateway_endpoint",
        env = "LATTICE_METRIC_PUSHGATEWAY_ENDPOINT",
        default_value = "prometheus-pushgateway.prometheus:9091"
    )]
    pub metric_pushgateway_endpoint: String,

    /// Metric pushgateway backend
    #[arg(long = "metric_pushgateway_backend", env = "LATTICE_METRIC_PUSHGATEWAY_BACKEND", default_value = "prometheus")]
    pub metric_pushgateway_backend: String,

    /// Command the agent runs in each worker subprocess
    pub entrypoint: String,

    /// Arguments forwarded to the worker command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub entrypoint_args: Vec<String>,
}

/// Invalid launcher flag values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("nnodes={0} is not in \"MIN:MAX\" format")]
    BadNnodes(String),

    #[error("nnodes range must satisfy 0 < MIN <= MAX, got {min}:{max}")]
    BadNnodesRange { min: u32, max: u32 },

    #[error("rdzv_conf entry is not key=value: {0}")]
    BadRdzvConf(String),
}

/// Parse `MIN[:MAX]` into an elastic node range.
pub fn parse_min_max_nnodes(nnodes: &str) -> Result<(u32, u32), ArgsError> {
    let bad = || ArgsError::BadNnodes(nnodes.to_string());
    let (min, max) = match nnodes.split_once(':') {
        None => {
            let n: u32 = nnodes.parse().map_err(|_| bad())?;
            (n, n)
        }
        Some((min, max)) => {
            (min.parse().map_err(|_| bad())?, max.parse().map_err(|_| bad())?)
        }
    };
    if min == 0 || min > max {
        return Err(ArgsError::BadNnodesRange { min, max });
    }
    Ok((min, max))
}

/// Parse `key1=value1,key2=value2,...` rendezvous extras.
pub fn parse_rdzv_conf(conf: &str) -> Result<HashMap<String, String>, ArgsError> {
    let mut configs = HashMap::new();
    for entry in conf.split(',') {
        if entry.is_empty() {
            continue;
        }
        let (key, value) =
            entry.split_once('=').ok_or_else(|| ArgsError::BadRdzvConf(entry.to_string()))?;
        if key.is_empty() {
            return Err(ArgsError::BadRdzvConf(entry.to_string()));
        }
        configs.insert(key.to_string(), value.to_string());
    }
    Ok(configs)
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
