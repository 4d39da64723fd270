//! Pycheck worker binary
//!
//! Usage:
//!     pycheck-worker --home ~/.pycheck < requests.jsonl > events.jsonl

use anyhow::{Context, Result};
use clap::Parser;
use pycheck_logging::{init_logging, LogConfig};
use pycheck_worker::{
    event_channel, spawn_gateway, transport, EngineSession, Gateway, StagingArea, UvPackageHost,
    WorkerArgs, WorkerConfig,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = WorkerArgs::parse();
    let config = WorkerConfig::from_args(&args)?;

    init_logging(LogConfig {
        app_name: "pycheck-worker",
        log_dir: config.log_dir.clone(),
        verbose: args.verbose,
        quiet: args.quiet,
    })?;

    info!("Starting Pycheck worker");
    info!("  Home: {}", config.home.display());
    info!("  Runtime: {}", config.runtime_dir.display());
    info!("  Staging: {}", config.staging_root.display());
    info!("  Default engine: {} {}", config.engine.package, config.default_engine_version);
    info!("  Pinned versions: {}", config.version_table.entries.len());

    let (events_tx, events_rx) = event_channel();

    let host = UvPackageHost::new(config.host_config(), Some(events_tx.clone()));
    let staging = StagingArea::new(&config.staging_root).with_context(|| {
        format!("Invalid staging root: {}", config.staging_root.display())
    })?;
    let session = EngineSession::new(
        Box::new(host),
        config.version_table.clone(),
        config.engine.clone(),
        staging,
    );
    let gateway = Gateway::new(session, events_tx, config.default_engine_version.clone());
    let handle = spawn_gateway(gateway).context("Failed to start gateway thread")?;

    transport::serve_stdio(handle, events_rx).await?;

    info!("Worker stopped");
    Ok(())
}
