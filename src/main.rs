use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use shopsync::config;
use shopsync::engine::SyncEngine;

#[derive(Debug, Parser)]
#[command(author, version, about = "Multi-store inventory reconciliation daemon")]
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

    let engine = Arc::new(SyncEngine::from_config(&cfg));

    let info = engine.get_store_info().await;
    for store in &info.stores {
        match &store.shop_name {
            Some(shop) => info!(store = %store.name, domain = %store.domain, shop = %shop, "store connected"),
            None => warn!(
                store = %store.name,
                domain = %store.domain,
                error = store.error.as_deref().unwrap_or("unknown"),
                "store unreachable"
            ),
        }
    }
    info!(
        active = info.active_stores,
        total = info.total_stores,
        "store connectivity check complete"
    );

    if engine.clone().start() {
        info!("sync daemon running; press Ctrl-C to stop");
    } else {
        warn!("no stores configured; nothing to synchronize");
    }

    tokio::signal::ctrl_c().await?;
    engine.stop();
    info!("shutdown complete");
    Ok(())
}
