use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bgs_catalog::config;
use bgs_catalog::docs;
use bgs_catalog::snapshot::{self, Layout};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Render markdown docs for heroes and per-tier minions from the fetched catalog"
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

    let (heroes, minions) =
        snapshot::read_items(&layout, cfg.region().as_str(), &cfg.bnet.locale).await?;
    let written = docs::generate_docs(&layout.docs_dir(), &heroes, &minions).await?;
    info!(files = written.len(), dir = %layout.docs_dir().display(), "docs generated from snapshot");
    Ok(())
}
