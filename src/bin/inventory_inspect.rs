use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use shopsync::config;
use shopsync::engine::SyncEngine;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Print the unified inventory report (or store connectivity) as JSON"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print store connectivity instead of the inventory report
    #[arg(long)]
    stores: bool,
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

    if args.stores {
        let info = engine.get_store_info().await;
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let report = engine.get_all_inventory().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
