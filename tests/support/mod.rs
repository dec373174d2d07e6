#![allow(dead_code)]

use bgs_catalog::catalog::CatalogClient;
use reqwest::Url;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::MockServer;

pub const LOCALE: &str = "en_US";

pub fn catalog_client(server: &MockServer) -> CatalogClient {
    let base = Url::parse(&format!("{}/hearthstone/", server.uri())).unwrap();
    CatalogClient::with_base_url(base, "test-token".into(), LOCALE.into(), Duration::from_secs(5))
        .unwrap()
}

/// `count` card records with consecutive ids starting at `first_id`.
pub fn cards(first_id: i64, count: usize) -> Value {
    let cards: Vec<Value> = (0..count as i64)
        .map(|i| {
            let id = first_id + i;
            json!({ "id": id, "name": format!("Card {id}"), "manaCost": 1 })
        })
        .collect();
    json!({ "cards": cards, "cardCount": count })
}
