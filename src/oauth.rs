//! Client-credentials token exchange against the regional Battle.net host.
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{Credentials, Region};

pub struct TokenProvider {
    http: Client,
    token_url: Url,
    credentials: Credentials,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl TokenProvider {
    pub fn new(region: Region, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let host = Url::parse(region.oauth_host()).context("invalid OAuth host")?;
        Self::with_host(host, credentials, timeout)
    }

    pub fn with_host(host: Url, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let token_url = host.join("/oauth/token").context("invalid OAuth token URL")?;
        let http = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            token_url,
            credentials,
        })
    }

    /// Exchange the client credentials for a bearer token.
    pub async fn get_access_token(&self) -> Result<String> {
        debug!(url=%self.token_url, "requesting access token");
        let res = self
            .http
            .post(self.token_url.clone())
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("failed to reach OAuth endpoint")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("failed to obtain token: {} {}", status, body));
        }

        let payload: TokenResponse = res.json().await.context("invalid token response")?;
        let token = payload
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("no access_token in response"))?;
        info!("obtained access token");
        Ok(token)
    }
}
