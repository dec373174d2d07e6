//! Markdown reference pages rendered from catalog items.
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::model::CatalogItem;

fn sort_key(item: &CatalogItem) -> &str {
    item.name().or(item.text()).unwrap_or("")
}

fn sorted_by_name(items: &[CatalogItem]) -> Vec<&CatalogItem> {
    let mut sorted: Vec<&CatalogItem> = items.iter().collect();
    sorted.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));
    sorted
}

fn one_line(text: Option<&str>) -> String {
    text.unwrap_or("").replace('\n', " ")
}


pub fn render_hero_line(hero: &CatalogItem) -> String {
    let armor = hero
        .armor()
        .map(|a| format!(" 护甲:{a}"))
        .unwrap_or_default();
    let tier = hero
        .tier()
        .map(|t| format!(" 等级:{t}"))
        .unwrap_or_default();
    format!(
        "- {}{}{} — {}",
        hero.name().unwrap_or(""),
        armor,
        tier,
        one_line(hero.text())
    )
}

pub fn render_minion_line(minion: &CatalogItem) -> String {
    format!(
        "- {} ({}/{}) [{}] — {}",
        minion.name().unwrap_or(""),
        minion.display_field("attack").unwrap_or_default(),
        minion.display_field("health").unwrap_or_default(),
        minion.tribe(),
        one_line(minion.text())
    )
}

pub fn render_heroes(heroes: &[CatalogItem]) -> String {
    let mut lines = vec!["# 英雄数据".to_string(), String::new()];
    lines.extend(sorted_by_name(heroes).into_iter().map(render_hero_line));
    lines.push(String::new());
    lines.join("\n")
}

pub fn render_tier(tier: i64, minions: &[CatalogItem]) -> String {
    let mut lines = vec![format!("# {tier}级随从"), String::new()];
    lines.extend(sorted_by_name(minions).into_iter().map(render_minion_line));
    lines.push(String::new());
    lines.join("\n")
}

/// Minions keyed by tavern tier; a missing tier counts as 0.
pub fn group_by_tier(minions: &[CatalogItem]) -> BTreeMap<i64, Vec<CatalogItem>> {
    let mut grouped: BTreeMap<i64, Vec<CatalogItem>> = BTreeMap::new();
    for minion in minions {
        grouped
            .entry(minion.tier().unwrap_or(0))
            .or_default()
            .push(minion.clone());
    }
    grouped
}

/// Copy an existing file to `{name}.bak.{timestamp}` before it is replaced.
async fn backup_file(path: &Path) -> Result<()> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }
    let ts = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(&[':', '.'][..], "-");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let backup = path.with_file_name(format!("{name}.bak.{ts}"));
    fs::copy(path, &backup)
        .await
        .with_context(|| format!("failed to back up {}", path.display()))?;
    debug!(backup = %backup.display(), "backed up previous doc");
    Ok(())
}

async fn write_doc(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    backup_file(path).await?;
    fs::write(path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Write `heroes/heroes_data.md` and one `minions/tier{N}_minions.md` per
/// tier under `docs_dir`. Returns the written paths.
pub async fn generate_docs(
    docs_dir: &Path,
    heroes: &[CatalogItem],
    minions: &[CatalogItem],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let heroes_path = docs_dir.join("heroes").join("heroes_data.md");
    write_doc(&heroes_path, &render_heroes(heroes)).await?;
    written.push(heroes_path);

    for (tier, group) in group_by_tier(minions) {
        let path = docs_dir
            .join("minions")
            .join(format!("tier{tier}_minions.md"));
        write_doc(&path, &render_tier(tier, &group)).await?;
        written.push(path);
    }

    info!(files = written.len(), "docs generated");
    Ok(written)
}
