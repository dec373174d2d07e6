use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bgs_catalog::config;
use bgs_catalog::snapshot::{self, Layout};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Split data/battlegrounds.json into heroes.json, minions.json and meta.json"
)]
struct Args {
    /// Optional YAML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    let layout = Layout::new(cfg.app.resolved_out_dir());

    snapshot::split_snapshot(&layout).await?;
    Ok(())
}
