use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bgs_catalog::{config, pipeline};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fetch the battlegrounds hero and minion catalog with image URLs into a local snapshot"
)]
struct Args {
    /// Optional YAML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the output root (BGS_OUT_DIR)
    #[arg(long)]
    out_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(out_dir) = args.out_dir {
        cfg.app.out_dir = out_dir;
    }
    cfg.require_credentials()?;
    cfg.ensure_dirs()?;

    info!(region = cfg.region().as_str(), locale = %cfg.bnet.locale, "starting catalog fetch");
    pipeline::run(&cfg).await?;
    Ok(())
}
