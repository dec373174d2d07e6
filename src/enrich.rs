use anyhow::{anyhow, Result};
use tracing::{info, instrument, warn};

use crate::catalog::CardSource;
use crate::model::{CardDetail, CardKind, CatalogItem};
use crate::pool::{self, Outcome};

/// Items after enrichment, same length and order as the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched {
    pub items: Vec<CatalogItem>,
    /// `(index, reason)` for every item left as it was.
    pub skipped: Vec<(usize, String)>,
}

impl Enriched {
    pub fn enriched_count(&self) -> usize {
        self.items.len() - self.skipped.len()
    }
}

/// Overlay the non-empty image fields of `detail` onto a copy of `item`.
/// Returns `None` when the detail carries neither.
pub fn merge_images(item: &CatalogItem, detail: &CardDetail) -> Option<CatalogItem> {
    if !detail.has_images() {
        return None;
    }
    let mut merged = item.clone();
    if let Some(image) = detail.image() {
        merged.set("image", image);
    }
    if let Some(image_gold) = detail.image_gold() {
        merged.set("imageGold", image_gold);
    }
    Some(merged)
}

async fn enrich_one(source: &dyn CardSource, item: &CatalogItem) -> Result<CatalogItem> {
    let id = item
        .identifier()
        .ok_or_else(|| anyhow!("item has no id"))?;
    let detail = source.fetch_detail(&id).await?;
    merge_images(item, &detail).ok_or_else(|| anyhow!("card {id} has no image fields"))
}

/// Fetch the detail resource of every item and merge its image URLs.
/// Failures are logged and leave the item untouched.
#[instrument(skip_all, fields(kind = %kind, count = items.len()))]
pub async fn enrich(
    source: &dyn CardSource,
    kind: CardKind,
    items: Vec<CatalogItem>,
    concurrency: usize,
) -> Enriched {
    let outcomes = pool::run(&items, concurrency, |_, item| enrich_one(source, item)).await;

    let mut skipped = Vec::new();
    let merged = outcomes
        .into_iter()
        .zip(items)
        .enumerate()
        .map(|(index, (outcome, original))| match outcome {
            Outcome::Success(item) => item,
            Outcome::Skipped(reason) => {
                warn!(index, id = ?original.identifier(), %reason, "enrichment skipped");
                skipped.push((index, reason));
                original
            }
        })
        .collect::<Vec<_>>();

    let result = Enriched {
        items: merged,
        skipped,
    };
    info!(
        enriched = result.enriched_count(),
        skipped = result.skipped.len(),
        "enrichment complete"
    );
    result
}
