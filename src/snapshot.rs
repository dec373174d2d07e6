//! On-disk layout and JSON outputs of the pipeline.
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::model::{CardKind, Cards, CatalogItem, Snapshot};

/// Paths of every artefact, relative to one output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unified(&self) -> PathBuf {
        self.root.join("data").join("battlegrounds.json")
    }

    /// Per-category file written next to the unified snapshot.
    pub fn category(&self, kind: CardKind, region: &str, locale: &str) -> PathBuf {
        self.root
            .join("output")
            .join(format!("bgs_{}_{}_{}.json", kind.plural(), region, locale))
    }

    pub fn split_dir(&self) -> PathBuf {
        self.root.join("data").join("bgs")
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join("static").join("media")
    }
}

/// Counts reported by [`split_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub heroes: usize,
    pub minions: usize,
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

async fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Write the unified snapshot and the per-category files. Existing files are
/// overwritten.
pub async fn write_snapshot(layout: &Layout, snapshot: &Snapshot) -> Result<()> {
    for kind in [CardKind::Hero, CardKind::Minion] {
        let path = layout.category(kind, &snapshot.region, &snapshot.locale);
        write_json(&path, snapshot.items(kind)).await?;
    }
    let unified = layout.unified();
    write_json(&unified, snapshot).await?;
    info!(
        path = %unified.display(),
        heroes = snapshot.cards.heroes.len(),
        minions = snapshot.cards.minions.len(),
        "snapshot written"
    );
    Ok(())
}

pub async fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let value = read_json(path).await?;
    serde_json::from_value(value).with_context(|| format!("invalid snapshot in {}", path.display()))
}

/// Only the `heroes` and `minions` arrays of a unified snapshot; the
/// metadata fields may be missing or malformed.
pub async fn read_cards(path: &Path) -> Result<Cards> {
    let value = read_json(path).await?;
    serde_json::from_value(value).with_context(|| format!("invalid card lists in {}", path.display()))
}

/// Per-category items, taken from the unified snapshot when readable and
/// from the per-category files otherwise.
pub async fn read_items(
    layout: &Layout,
    region: &str,
    locale: &str,
) -> Result<(Vec<CatalogItem>, Vec<CatalogItem>)> {
    match read_cards(&layout.unified()).await {
        Ok(cards) => Ok((cards.heroes, cards.minions)),
        Err(err) => {
            info!(reason = %format!("{err:#}"), "unified snapshot unavailable; using per-category files");
            let heroes = read_json(&layout.category(CardKind::Hero, region, locale)).await?;
            let minions = read_json(&layout.category(CardKind::Minion, region, locale)).await?;
            Ok((serde_json::from_value(heroes)?, serde_json::from_value(minions)?))
        }
    }
}

/// Split the unified snapshot into `heroes.json`, `minions.json` and
/// `meta.json` (every other top-level field, original order kept).
///
/// The transform works on raw JSON values so identical input always gives
/// byte-identical output.
pub async fn split_snapshot(layout: &Layout) -> Result<SplitSummary> {
    let input = layout.unified();
    if !fs::try_exists(&input).await.unwrap_or(false) {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    let all = match read_json(&input).await? {
        Value::Object(map) => map,
        _ => return Err(anyhow!("{} is not a JSON object", input.display())),
    };

    let mut meta = Map::new();
    let mut heroes = Value::Array(Vec::new());
    let mut minions = Value::Array(Vec::new());
    for (key, value) in all {
        match key.as_str() {
            "heroes" => heroes = value,
            "minions" => minions = value,
            _ => {
                meta.insert(key, value);
            }
        }
    }

    let out = layout.split_dir();
    write_json(&out.join("heroes.json"), &heroes).await?;
    write_json(&out.join("minions.json"), &minions).await?;
    write_json(&out.join("meta.json"), &meta).await?;

    let count = |v: &Value| v.as_array().map_or(0, Vec::len);
    let summary = SplitSummary {
        heroes: count(&heroes),
        minions: count(&minions),
    };
    info!(heroes = summary.heroes, minions = summary.minions, "split completed");
    Ok(summary)
}
