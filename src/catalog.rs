use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Region;
use crate::model::{CardDetail, CardId, CardKind, CatalogItem};

const GAME_MODE: &str = "battlegrounds";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("pagination for {kind} did not terminate within {max_pages} pages")]
    PaginationExceeded { kind: CardKind, max_pages: usize },
}

/// Read access to the card catalog. Implemented over HTTP by
/// [`CatalogClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// One page of the list endpoint, 1-based.
    async fn fetch_page(&self, kind: CardKind, page: usize, page_size: usize)
        -> Result<Vec<CatalogItem>>;

    /// Image fields of a single card.
    async fn fetch_detail(&self, id: &CardId) -> Result<CardDetail>;
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: Url,
    token: String,
    locale: String,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(region: Region, token: String, locale: String, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/hearthstone/", region.api_host()))
            .context("invalid catalog API URL")?;
        Self::with_base_url(base_url, token, locale, timeout)
    }

    /// `base_url` must end with `/` so relative joins land under it.
    pub fn with_base_url(
        base_url: Url,
        token: String,
        locale: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("bgs-catalog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            locale,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn build_list_request(
        &self,
        kind: CardKind,
        page: usize,
        page_size: usize,
    ) -> Result<reqwest::Request> {
        let endpoint = self.base_url.join("cards").context("invalid catalog base URL")?;
        self.http
            .get(endpoint)
            .bearer_auth(&self.token)
            .query(&[
                ("locale", self.locale.as_str()),
                ("gameMode", GAME_MODE),
                ("type", kind.as_str()),
            ])
            .query(&[("page", page), ("pageSize", page_size)])
            .build()
            .context("failed to build list request")
    }

    pub fn build_detail_request(&self, id: &CardId) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(&format!("cards/{id}"))
            .context("invalid card detail URL")?;
        self.http
            .get(endpoint)
            .bearer_auth(&self.token)
            .query(&[("locale", self.locale.as_str())])
            .build()
            .context("failed to build detail request")
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    cards: Option<Vec<CatalogItem>>,
}

#[async_trait]
impl CardSource for CatalogClient {
    async fn fetch_page(
        &self,
        kind: CardKind,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<CatalogItem>> {
        let request = self.build_list_request(kind, page, page_size)?;
        debug!(url=%request.url(), "fetching catalog page");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach catalog API")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body }.into());
        }

        let payload: ListResponse = res.json().await.context("invalid catalog list response")?;
        Ok(payload.cards.unwrap_or_default())
    }

    async fn fetch_detail(&self, id: &CardId) -> Result<CardDetail> {
        let request = self.build_detail_request(id)?;
        debug!(url=%request.url(), "fetching card detail");
        let res = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("failed to reach detail endpoint for card {id}"))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body }.into());
        }

        res.json::<CardDetail>()
            .await
            .with_context(|| format!("invalid detail response for card {id}"))
    }
}
