// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint service daemon.

use clap::Parser;
use lattice_ckpt::{
    serve, ServerConfig, DEFAULT_MAX_CKPT_BYTES, DEFAULT_MAX_TOTAL_BYTES, DEFAULT_NUM_WORKERS,
    DEFAULT_PORT,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lattice-ckptd", about = "In-memory checkpoint service")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of worker tasks handling requests
    #[arg(long, default_value_t = DEFAULT_NUM_WORKERS)]
    num_workers: usize,

    /// Per-checkpoint size cap in bytes (oversized saves are rejected)
    #[arg(long, default_value_t = DEFAULT_MAX_CKPT_BYTES)]
    max_ckpt_bytes: usize,

    /// Total-bytes threshold before eviction warnings
    #[arg(long, default_value_t = DEFAULT_MAX_TOTAL_BYTES)]
    max_total_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let server = serve(ServerConfig {
        port: args.port,
        num_workers: args.num_workers,
        max_ckpt_bytes: args.max_ckpt_bytes,
        max_total_bytes: args.max_total_bytes,
    })
    .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down checkpoint service");
    server.shutdown();
    Ok(())
}
