//! Fetch stage: list both categories, enrich them, write the snapshot.
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, instrument};

use crate::catalog::{CardSource, CatalogClient};
use crate::config::Config;
use crate::enrich::{self, Enriched};
use crate::model::{CardKind, Cards, Snapshot};
use crate::oauth::TokenProvider;
use crate::paged;
use crate::snapshot::{self, Layout};

/// Tuning for one fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: usize,
    pub max_pages: usize,
    pub enrich_concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: paged::DEFAULT_PAGE_SIZE,
            max_pages: paged::DEFAULT_MAX_PAGES,
            enrich_concurrency: crate::pool::DEFAULT_CONCURRENCY,
        }
    }
}

impl From<&Config> for FetchOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            page_size: cfg.app.page_size,
            max_pages: cfg.app.max_pages,
            enrich_concurrency: cfg.app.enrich_concurrency,
        }
    }
}

/// Fetch heroes and minions concurrently, then enrich both concurrently.
/// A failed list fetch aborts the run; enrichment failures only leave the
/// affected items without images.
#[instrument(skip_all, fields(region = region, locale = locale))]
pub async fn build_snapshot(
    source: &dyn CardSource,
    region: &str,
    locale: &str,
    opts: FetchOptions,
) -> Result<Snapshot> {
    let (heroes, minions) = tokio::try_join!(
        paged::fetch_all(source, CardKind::Hero, opts.page_size, opts.max_pages),
        paged::fetch_all(source, CardKind::Minion, opts.page_size, opts.max_pages),
    )?;
    info!(heroes = heroes.len(), minions = minions.len(), "catalog listed");

    let (heroes, minions): (Enriched, Enriched) = tokio::join!(
        enrich::enrich(source, CardKind::Hero, heroes, opts.enrich_concurrency),
        enrich::enrich(source, CardKind::Minion, minions, opts.enrich_concurrency),
    );

    Ok(Snapshot {
        region: region.to_string(),
        locale: locale.to_string(),
        generated_at: Utc::now(),
        cards: Cards {
            heroes: heroes.items,
            minions: minions.items,
        },
    })
}

/// Full fetch stage from configuration: token, catalog, enrichment, files.
pub async fn run(cfg: &Config) -> Result<Snapshot> {
    let credentials = cfg.require_credentials()?;
    let region = cfg.region();
    let layout = Layout::new(cfg.app.resolved_out_dir());

    let tokens = TokenProvider::new(region, credentials, cfg.request_timeout())?;
    let token = tokens
        .get_access_token()
        .await
        .context("token acquisition failed")?;

    let client = CatalogClient::new(
        region,
        token,
        cfg.bnet.locale.clone(),
        cfg.request_timeout(),
    )?;
    let snapshot = build_snapshot(&client, region.as_str(), client.locale(), cfg.into()).await?;
    snapshot::write_snapshot(&layout, &snapshot).await?;
    info!(
        heroes = snapshot.cards.heroes.len(),
        minions = snapshot.cards.minions.len(),
        out = %layout.root().display(),
        "saved catalog snapshot"
    );
    Ok(snapshot)
}
