//! Local mirror of card artwork referenced by a snapshot.
//!
//! Planning is pure: every http(s) `image`/`imageGold` URL becomes a
//! [`MediaJob`] whose destination depends only on the owning card's id,
//! slug/name and the URL's extension, so reruns overwrite the same files.
//! Downloading is best-effort; a failed asset is logged and skipped.
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Url};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::model::{CardKind, Cards, CatalogItem};
use crate::pool::{self, Outcome};

pub const DEFAULT_EXTENSION: &str = ".png";
pub const GOLD_SUFFIX: &str = "_gold";
pub const HERO_MAP_FILE: &str = "heroes.map.json";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125 Safari/537.36";
const ASSET_REFERER: &str = "https://playhearthstone.com/";

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaJob {
    pub url: String,
    pub dest: PathBuf,
    /// `dest` relative to the media root, `/`-separated.
    pub relative: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeroMapEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "imageGold", skip_serializing_if = "Option::is_none")]
    pub image_gold: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPlan {
    pub jobs: Vec<MediaJob>,
    pub hero_map: Vec<HeroMapEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaReport {
    pub planned: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, "_").into_owned()
}

/// Extension (with the dot) of the URL path's last segment, or `.png` when
/// the URL does not parse or has none.
pub fn extension_from_url(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| {
            let segment = url.path_segments()?.next_back()?.to_string();
            let dot = segment.rfind('.').filter(|&i| i > 0)?;
            Some(segment[dot..].to_string())
        })
        .filter(|ext| ext.len() > 1)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn card_key(item: &CatalogItem) -> String {
    item.identifier()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// `{id}_{slug or name}`, sanitized.
pub fn base_name(item: &CatalogItem) -> String {
    let label = item.slug().or(item.name()).unwrap_or("");
    sanitize_file_name(&format!("{}_{}", card_key(item), label))
}

/// File name for one of the item's images; gold variants get `_gold`.
pub fn file_name_for(item: &CatalogItem, url: &str, gold: bool) -> String {
    let suffix = if gold { GOLD_SUFFIX } else { "" };
    format!("{}{}{}", base_name(item), suffix, extension_from_url(url))
}

fn remote_url(value: Option<&str>) -> Option<&str> {
    value.filter(|u| u.starts_with("http://") || u.starts_with("https://"))
}

/// Build download jobs for every remote image in `cards` plus the hero
/// id → local path mapping.
pub fn plan(cards: &Cards, media_dir: &Path) -> MediaPlan {
    let mut plan = MediaPlan::default();
    let mut seen = HashSet::new();

    for kind in [CardKind::Hero, CardKind::Minion] {
        let dir = kind.plural();
        for item in cards.items(kind) {
            let mut push = |url: &str, gold: bool| -> String {
                let file = file_name_for(item, url, gold);
                let relative = format!("{dir}/{file}");
                if seen.insert((url.to_string(), relative.clone())) {
                    plan.jobs.push(MediaJob {
                        url: url.to_string(),
                        dest: media_dir.join(dir).join(&file),
                        relative: relative.clone(),
                    });
                }
                relative
            };
            let image = remote_url(item.image()).map(|u| push(u, false));
            let image_gold = remote_url(item.image_gold()).map(|u| push(u, true));

            if kind == CardKind::Hero {
                plan.hero_map.push(HeroMapEntry {
                    id: card_key(item),
                    slug: item.slug().map(String::from),
                    name: item.name().map(String::from),
                    image,
                    image_gold,
                });
            }
        }
    }
    plan
}

/// HTTP client for the asset CDN, which rejects requests without a browser
/// user agent and referer.
#[derive(Debug, Clone)]
pub struct MediaClient {
    http: Client,
}

impl MediaClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(ASSET_REFERER));
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build media HTTP client")?;
        Ok(Self { http })
    }

    /// Stream `job.url` into a temporary sibling of `job.dest`, then move it
    /// into place so a failed transfer never leaves a truncated file behind.
    pub async fn download(&self, job: &MediaJob) -> Result<u64> {
        let res = self
            .http
            .get(&job.url)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", job.url))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("download failed {} {} {}", status, job.url, body));
        }

        let file_name = job
            .dest
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid destination {}", job.dest.display()))?;
        let tmp = job
            .dest
            .with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4()));

        let written = match stream_to_file(res, &tmp).await {
            Ok(n) => n,
            Err(err) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(err);
            }
        };
        if let Err(err) = fs::rename(&tmp, &job.dest).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err)
                .with_context(|| format!("failed to move download into {}", job.dest.display()));
        }
        debug!(url = %job.url, bytes = written, "downloaded asset");
        Ok(written)
    }
}

async fn stream_to_file(res: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut stream = res.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("download interrupted")?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Run every job through the worker pool; failures are logged and counted.
pub async fn download_all(client: &MediaClient, jobs: &[MediaJob], concurrency: usize) -> MediaReport {
    let outcomes = pool::run(jobs, concurrency, |_, job| client.download(job)).await;

    let mut report = MediaReport {
        planned: jobs.len(),
        ..Default::default()
    };
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Outcome::Success(_) => report.downloaded += 1,
            Outcome::Skipped(reason) => {
                warn!(url = %job.url, %reason, "skip");
                report.failed += 1;
            }
        }
    }
    report
}

/// Mirror all card artwork under `media_dir` and write `heroes.map.json`.
#[instrument(skip_all, fields(media_dir = %media_dir.display()))]
pub async fn mirror_cards(
    client: &MediaClient,
    cards: &Cards,
    media_dir: &Path,
    concurrency: usize,
) -> Result<MediaReport> {
    for kind in [CardKind::Hero, CardKind::Minion] {
        let dir = media_dir.join(kind.plural());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create media dir: {}", dir.display()))?;
    }

    let plan = plan(cards, media_dir);
    info!(jobs = plan.jobs.len(), concurrency, "downloading media");
    let report = download_all(client, &plan.jobs, concurrency).await;

    let map_path = media_dir.join(HERO_MAP_FILE);
    let body = serde_json::to_string_pretty(&plan.hero_map)?;
    fs::write(&map_path, body)
        .await
        .with_context(|| format!("failed to write {}", map_path.display()))?;

    info!(
        downloaded = report.downloaded,
        failed = report.failed,
        heroes = plan.hero_map.len(),
        "media mirror complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> CatalogItem {
        serde_json::from_value(value).unwrap()
    }

    fn cards(heroes: Vec<CatalogItem>, minions: Vec<CatalogItem>) -> Cards {
        Cards { heroes, minions }
    }

    #[test]
    fn file_names_are_sanitized() {
        let card = item(json!({ "id": "123", "name": "Foo Bar!" }));
        assert_eq!(
            file_name_for(&card, "https://cdn.example/a/b.png", false),
            "123_Foo_Bar_.png"
        );
        assert_eq!(
            file_name_for(&card, "https://cdn.example/a/b.png", true),
            "123_Foo_Bar__gold.png"
        );
        assert_eq!(sanitize_file_name("a/b\\c:d é"), "a_b_c_d__");
    }

    #[test]
    fn slug_wins_over_name_and_missing_id_is_unknown() {
        let card = item(json!({ "slug": "58536-sir-finley", "name": "Sir Finley" }));
        assert_eq!(base_name(&card), "unknown_58536-sir-finley");
        let card = item(json!({ "id": 5 }));
        assert_eq!(base_name(&card), "5_");
    }

    #[test]
    fn extension_defaults_to_png() {
        assert_eq!(extension_from_url("https://x/y/card.jpg?v=2"), ".jpg");
        assert_eq!(extension_from_url("https://x/y/card"), ".png");
        assert_eq!(extension_from_url("https://x/?only=query"), ".png");
        assert_eq!(extension_from_url("https://x/y/.hidden"), ".png");
        assert_eq!(extension_from_url("not a url"), ".png");
    }

    #[test]
    fn plan_is_deterministic_and_skips_non_http() {
        let snap = cards(
            vec![
                item(json!({
                    "id": 1, "name": "Hero One",
                    "image": "https://cdn/h1.png", "imageGold": "https://cdn/h1g.webp"
                })),
                item(json!({ "id": 2, "name": "Bare", "image": "data:image/png;base64,AAA" })),
            ],
            vec![
                item(json!({ "id": 3, "slug": "m3", "image": "https://cdn/m3.png" })),
                item(json!({ "id": 3, "slug": "m3", "image": "https://cdn/m3.png" })),
            ],
        );
        let root = Path::new("/media");
        let first = plan(&snap, root);
        assert_eq!(first, plan(&snap, root));

        let relatives: Vec<&str> = first.jobs.iter().map(|j| j.relative.as_str()).collect();
        assert_eq!(
            relatives,
            vec![
                "heroes/1_Hero_One.png",
                "heroes/1_Hero_One_gold.webp",
                "minions/3_m3.png"
            ]
        );
        assert_eq!(first.jobs[2].dest, root.join("minions").join("3_m3.png"));

        assert_eq!(first.hero_map.len(), 2);
        assert_eq!(first.hero_map[0].image.as_deref(), Some("heroes/1_Hero_One.png"));
        assert_eq!(first.hero_map[1].image, None);
        assert_eq!(
            serde_json::to_value(&first.hero_map[0]).unwrap(),
            json!({
                "id": "1",
                "name": "Hero One",
                "image": "heroes/1_Hero_One.png",
                "imageGold": "heroes/1_Hero_One_gold.webp"
            })
        );
    }
}
