use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use shopsync::config;
use shopsync::engine::SyncEngine;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run one full reconciliation pass across all configured stores and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let engine = SyncEngine::from_config(&cfg);

    if engine.store_count() == 0 {
        bail!("no stores configured");
    }

    let info = engine.get_store_info().await;
    info!(
        active = info.active_stores,
        total = info.total_stores,
        "starting bulk reconciliation"
    );
    for store in info.stores.iter().filter(|s| !s.success) {
        warn!(
            store = %store.name,
            error = store.error.as_deref().unwrap_or("unknown"),
            "store unreachable; its channels will be skipped"
        );
    }

    let report = engine.bulk_sync().await;
    info!(
        items = report.total_items,
        out_of_sync = report.out_of_sync_items,
        attempted = report.updates_attempted,
        succeeded = report.updates_succeeded,
        "bulk reconciliation finished"
    );

    if !report.success {
        bail!("bulk sync incomplete: {}", report.message);
    }
    info!("{}", report.message);
    Ok(())
}
