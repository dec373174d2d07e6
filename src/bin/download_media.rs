use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bgs_catalog::config;
use bgs_catalog::media::{self, MediaClient};
use bgs_catalog::snapshot::{self, Layout};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Download hero and minion artwork referenced by data/battlegrounds.json into static/media"
)]
struct Args {
    /// Optional YAML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Concurrent downloads (overrides MEDIA_DL_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,
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
    let concurrency = args.concurrency.unwrap_or(cfg.app.media_concurrency);

    let cards = snapshot::read_cards(&layout.unified()).await?;
    let client = MediaClient::new(cfg.request_timeout())?;
    let report = media::mirror_cards(&client, &cards, &layout.media_dir(), concurrency).await?;

    info!(
        planned = report.planned,
        downloaded = report.downloaded,
        failed = report.failed,
        "media saved to {}",
        layout.media_dir().display()
    );
    Ok(())
}
