// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Elastic training agent launcher.
//!
//! Exit codes: 0 when the worker group succeeded, 1 on failure or bad
//! configuration, `128 + signal` when a death signal ended the run.

mod args;
mod exit_error;
mod nproc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::{parse_min_max_nnodes, parse_rdzv_conf, Args};
use exit_error::ExitError;
use lattice_agent::{launch_agent, AgentOutcome, LaunchConfig, Registries};
use lattice_core::{Std, StdSpec};
use nproc::determine_local_world_size;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("lattice: {e}");
        std::process::exit(e.code());
    }
}

fn run(args: Args) -> Result<(), ExitError> {
    match build_and_launch(args)? {
        AgentOutcome::Completed(result) if result.is_failed() => {
            tracing::error!(failures = result.failures.len(), "worker group failed");
            Err(ExitError::WorkerFailure { failed: result.failures.len() })
        }
        AgentOutcome::Completed(_) => Ok(()),
        AgentOutcome::Signaled(signal) => Err(ExitError::Signaled { signal }),
    }
}

fn build_and_launch(args: Args) -> anyhow::Result<AgentOutcome> {
    let (min_nodes, max_nodes) = parse_min_max_nnodes(&args.nnodes)?;
    let nproc_per_node = determine_local_world_size(&args.nproc_per_node)?;
    let rdzv_configs = parse_rdzv_conf(&args.rdzv_conf)?;

    // Workers inherit this; unbounded thread pools on a shared node would
    // oversubscribe the cores.
    if std::env::var_os("OMP_NUM_THREADS").is_none() && nproc_per_node > 1 {
        tracing::warn!(
            "setting OMP_NUM_THREADS=1 for each process by default; tune it \
             for optimal performance in your application"
        );
        std::env::set_var("OMP_NUM_THREADS", "1");
    }

    let config = LaunchConfig::new(&args.framework, min_nodes, max_nodes, nproc_per_node)
        .run_id(&args.rdzv_id)
        .rdzv_backend(&args.rdzv_backend)
        .rdzv_endpoint(&args.rdzv_client_service_host)
        .rdzv_port(&args.rdzv_client_service_port)
        .rdzv_configs(rdzv_configs)
        .tee(StdSpec::Single(Std::Err))
        .metric_pushgateway_endpoint(&args.metric_pushgateway_endpoint)
        .metric_pushgateway_backend(&args.metric_pushgateway_backend);

    let outcome = launch_agent(
        &config,
        &args.entrypoint,
        args.entrypoint_args,
        &Registries::default(),
    )?;
    Ok(outcome)
}
