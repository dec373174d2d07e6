use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// The two card categories the battlegrounds catalog is fetched in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Hero,
    Minion,
}

impl CardKind {
    /// Value of the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Hero => "hero",
            CardKind::Minion => "minion",
        }
    }

    /// Directory and file stem used for this category on disk.
    pub fn plural(&self) -> &'static str {
        match self {
            CardKind::Hero => "heroes",
            CardKind::Minion => "minions",
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card identifier; the API uses integers but string ids are passed through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardId {
    Int(i64),
    Str(String),
}

impl CardId {
    fn from_value(value: &Value) -> Option<CardId> {
        match value {
            Value::Number(n) => n.as_i64().map(CardId::Int),
            Value::String(s) if !s.is_empty() => Some(CardId::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardId::Int(n) => write!(f, "{n}"),
            CardId::Str(s) => f.write_str(s),
        }
    }
}

/// One hero or minion record, kept as the raw JSON object it arrived as.
///
/// Nothing is re-typed on the way in, so unexpected value types, explicit
/// nulls and key order all survive to the written snapshot. The accessors
/// below read the fields the pipeline cares about and tolerate odd types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogItem(Map<String, Value>);

impl CatalogItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set `key`, keeping its position when already present.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Non-empty string value of `key`.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// `key` rendered for humans: strings as-is, other scalars as JSON,
    /// null or absent as `None`.
    pub fn display_field(&self, key: &str) -> Option<String> {
        display(self.0.get(key)?)
    }

    /// `id`, falling back to a passthrough `cardId`.
    pub fn identifier(&self) -> Option<CardId> {
        self.0
            .get("id")
            .and_then(CardId::from_value)
            .or_else(|| self.0.get("cardId").and_then(CardId::from_value))
    }

    pub fn slug(&self) -> Option<&str> {
        self.str_field("slug")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn text(&self) -> Option<&str> {
        self.str_field("text")
    }

    pub fn image(&self) -> Option<&str> {
        self.str_field("image")
    }

    pub fn image_gold(&self) -> Option<&str> {
        self.str_field("imageGold")
    }

    fn battlegrounds(&self, key: &str) -> Option<&Value> {
        self.0.get("battlegrounds")?.get(key)
    }

    /// Tavern tier; numeric strings are accepted.
    pub fn tier(&self) -> Option<i64> {
        self.battlegrounds("tier").and_then(as_integer)
    }

    pub fn armor(&self) -> Option<i64> {
        self.battlegrounds("armor").and_then(as_integer)
    }

    /// Tribe label for docs: `minionType`, else `races` joined.
    pub fn tribe(&self) -> String {
        let render = |v: &Value| match v {
            Value::Array(items) => items
                .iter()
                .filter_map(display)
                .collect::<Vec<_>>()
                .join(","),
            other => display(other).unwrap_or_default(),
        };
        for key in ["minionType", "races"] {
            if let Some(label) = self.0.get(key).map(render).filter(|s| !s.is_empty()) {
                return label;
            }
        }
        String::new()
    }
}

impl From<Map<String, Value>> for CatalogItem {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Image fields returned by the card detail endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardDetail {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "imageGold", default)]
    pub image_gold: Option<String>,
}

impl CardDetail {
    /// `image`, unless missing or empty.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.is_empty())
    }

    /// `imageGold`, unless missing or empty.
    pub fn image_gold(&self) -> Option<&str> {
        self.image_gold.as_deref().filter(|s| !s.is_empty())
    }

    pub fn has_images(&self) -> bool {
        self.image().is_some() || self.image_gold().is_some()
    }
}

/// The two item lists of a snapshot. The media stage reads only these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cards {
    #[serde(default)]
    pub heroes: Vec<CatalogItem>,
    #[serde(default)]
    pub minions: Vec<CatalogItem>,
}

impl Cards {
    pub fn items(&self, kind: CardKind) -> &[CatalogItem] {
        match kind {
            CardKind::Hero => &self.heroes,
            CardKind::Minion => &self.minions,
        }
    }
}

/// Output of one fetch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub region: String,
    pub locale: String,
    #[serde(with = "iso_millis")]
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub cards: Cards,
}

impl Snapshot {
    pub fn items(&self, kind: CardKind) -> &[CatalogItem] {
        self.cards.items(kind)
    }
}

/// `generatedAt` is written as `2024-05-01T10:00:00.000Z`.
mod iso_millis {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
