use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::catalog::{CardSource, CatalogError};
use crate::model::{CardKind, CatalogItem};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Fetch every page of `kind` until a page comes back shorter than
/// `page_size`. Any failed page aborts the whole fetch; nothing partial is
/// returned. More than `max_pages` full pages is treated as a runaway endpoint.
#[instrument(skip_all, fields(kind = %kind))]
pub async fn fetch_all(
    source: &dyn CardSource,
    kind: CardKind,
    page_size: usize,
    max_pages: usize,
) -> Result<Vec<CatalogItem>> {
    let page_size = page_size.max(1);
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        if page > max_pages {
            return Err(CatalogError::PaginationExceeded { kind, max_pages }.into());
        }
        let batch = source.fetch_page(kind, page, page_size).await?;
        let received = batch.len();
        debug!(page, received, "received catalog page");
        items.extend(batch);
        if received < page_size {
            break;
        }
        page += 1;
    }

    info!(pages = page, total = items.len(), "catalog fetch complete");
    Ok(items)
}
