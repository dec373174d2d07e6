//! Configuration loader and validator for the catalog pipeline.
//!
//! Values come from built-in defaults, then an optional YAML file, then the
//! environment (`BNET_*`, `MEDIA_DL_CONCURRENCY`, ...), later sources winning.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub bnet: Bnet,
    pub app: App,
}

/// Battle.net credentials and catalog selection.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Bnet {
    pub client_id: String,
    pub client_secret: String,
    pub region: String,
    pub locale: String,
}

impl Default for Bnet {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            region: "us".into(),
            locale: "zh_CN".into(),
        }
    }
}

impl fmt::Debug for Bnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bnet")
            .field("client_id", &self.client_id)
            .field("region", &self.region)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

/// Pipeline tuning and output location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub out_dir: String,
    pub enrich_concurrency: usize,
    pub media_concurrency: usize,
    pub request_timeout_secs: u64,
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for App {
    fn default() -> Self {
        Self {
            out_dir: ".".into(),
            enrich_concurrency: 12,
            media_concurrency: 12,
            request_timeout_secs: 30,
            page_size: 100,
            max_pages: 1000,
        }
    }
}

/// Client credentials extracted once the fetch stage needs them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Battle.net regions. Each one has its own OAuth and API hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Us,
    Eu,
    Kr,
    Tw,
    Cn,
}

impl Region {
    /// Parse a region code, falling back to `Us` for anything unrecognized.
    pub fn parse_lossy(code: &str) -> Region {
        match code.trim().to_ascii_lowercase().as_str() {
            "us" => Region::Us,
            "eu" => Region::Eu,
            "kr" => Region::Kr,
            "tw" => Region::Tw,
            "cn" => Region::Cn,
            other => {
                warn!(region = other, "unknown region; falling back to us");
                Region::Us
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
            Region::Kr => "kr",
            Region::Tw => "tw",
            Region::Cn => "cn",
        }
    }

    pub fn oauth_host(&self) -> &'static str {
        match self {
            Region::Us => "https://us.battle.net",
            Region::Eu => "https://eu.battle.net",
            Region::Kr => "https://kr.battle.net",
            Region::Tw => "https://tw.battle.net",
            Region::Cn => "https://www.battlenet.com.cn",
        }
    }

    pub fn api_host(&self) -> &'static str {
        match self {
            Region::Us => "https://us.api.blizzard.com",
            Region::Eu => "https://eu.api.blizzard.com",
            Region::Kr => "https://kr.api.blizzard.com",
            Region::Tw => "https://tw.api.blizzard.com",
            Region::Cn => "https://gateway.battlenet.com.cn",
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.out_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.app.resolved_out_dir())
    }

    pub fn region(&self) -> Region {
        Region::parse_lossy(&self.bnet.region)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }

    /// Credentials are only needed by the fetch stage, so they are checked
    /// here rather than in `validate`.
    pub fn require_credentials(&self) -> Result<Credentials, ConfigError> {
        if self.bnet.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("BNET_CLIENT_ID must be set"));
        }
        if self.bnet.client_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("BNET_CLIENT_SECRET must be set"));
        }
        Ok(Credentials {
            client_id: self.bnet.client_id.trim().to_string(),
            client_secret: self.bnet.client_secret.trim().to_string(),
        })
    }
}

impl App {
    /// Output root with a leading `~/` expanded to `$HOME`.
    pub fn resolved_out_dir(&self) -> PathBuf {
        if let Some(rest) = self.out_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(&self.out_dir)
    }
}

/// Load configuration from the process environment and an optional YAML file.
/// - If `path` is None, `config.yaml` is read when present and skipped otherwise.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(p) => parse_file(p)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            parse_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };
    apply_env(&mut cfg, lookup)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn parse_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn apply_env<F>(cfg: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get("BNET_CLIENT_ID") {
        cfg.bnet.client_id = v;
    }
    if let Some(v) = get("BNET_CLIENT_SECRET") {
        cfg.bnet.client_secret = v;
    }
    if let Some(v) = get("BNET_REGION") {
        cfg.bnet.region = v.to_ascii_lowercase();
    }
    if let Some(v) = get("BNET_LOCALE") {
        cfg.bnet.locale = v;
    }
    if let Some(v) = get("BGS_OUT_DIR") {
        cfg.app.out_dir = v;
    }
    if let Some(v) = get("ENRICH_CONCURRENCY") {
        cfg.app.enrich_concurrency = parse_number("ENRICH_CONCURRENCY", v)?;
    }
    if let Some(v) = get("MEDIA_DL_CONCURRENCY") {
        cfg.app.media_concurrency = parse_number("MEDIA_DL_CONCURRENCY", v)?;
    }
    if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
        cfg.app.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", v)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Env { key, value })
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.bnet.locale.trim().is_empty() {
        return Err(ConfigError::Invalid("bnet.locale must be non-empty"));
    }
    if cfg.app.out_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.out_dir must be non-empty"));
    }
    if cfg.app.enrich_concurrency == 0 {
        return Err(ConfigError::Invalid("app.enrich_concurrency must be > 0"));
    }
    if cfg.app.media_concurrency == 0 {
        return Err(ConfigError::Invalid("app.media_concurrency must be > 0"));
    }
    if cfg.app.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_secs must be > 0"));
    }
    if cfg.app.page_size == 0 {
        return Err(ConfigError::Invalid("app.page_size must be > 0"));
    }
    if cfg.app.max_pages == 0 {
        return Err(ConfigError::Invalid("app.max_pages must be > 0"));
    }
    Ok(())
}

/// Returns an example YAML configuration.
pub fn example() -> &'static str {
    r#"bnet:
  client_id: "YOUR_BNET_CLIENT_ID"
  client_secret: "YOUR_BNET_CLIENT_SECRET"
  region: "us"
  locale: "zh_CN"

app:
  out_dir: "."
  enrich_concurrency: 12
  media_concurrency: 12
  request_timeout_secs: 30
  page_size: 100
  max_pages: 1000
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_example() -> (tempfile::TempDir, PathBuf) {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        (td, p)
    }

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.media_concurrency, 12);
        assert_eq!(cfg.region(), Region::Us);
    }

    #[test]
    fn env_overrides_file() {
        let (_td, p) = write_example();
        let cfg = load_with(
            Some(&p),
            env(&[
                ("BNET_CLIENT_ID", "abc"),
                ("BNET_REGION", "EU"),
                ("MEDIA_DL_CONCURRENCY", "4"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.bnet.client_id, "abc");
        assert_eq!(cfg.bnet.client_secret, "YOUR_BNET_CLIENT_SECRET");
        assert_eq!(cfg.region(), Region::Eu);
        assert_eq!(cfg.app.media_concurrency, 4);
    }

    #[test]
    fn defaults_apply_without_file() {
        let td = tempdir().unwrap();
        let p = td.path().join("empty.yaml");
        fs::write(&p, "").unwrap();
        let cfg = load_with(Some(&p), env(&[])).unwrap();
        assert_eq!(cfg.bnet.locale, "zh_CN");
        assert_eq!(cfg.app.enrich_concurrency, 12);
        assert_eq!(cfg.app.page_size, 100);
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let td = tempdir().unwrap();
        let err = load_with(Some(&td.path().join("nope.yaml")), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bad_numeric_env_is_rejected() {
        let (_td, p) = write_example();
        let err = load_with(Some(&p), env(&[("MEDIA_DL_CONCURRENCY", "lots")])).unwrap_err();
        match err {
            ConfigError::Env { key, value } => {
                assert_eq!(key, "MEDIA_DL_CONCURRENCY");
                assert_eq!(value, "lots");
            }
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let (_td, p) = write_example();
        let err = load_with(Some(&p), env(&[("ENRICH_CONCURRENCY", "0")])).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("enrich_concurrency")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn credentials_required_for_fetch() {
        let td = tempdir().unwrap();
        let p = td.path().join("empty.yaml");
        fs::write(&p, "").unwrap();
        let cfg = load_with(Some(&p), env(&[("BNET_CLIENT_SECRET", "s")])).unwrap();
        match cfg.require_credentials().unwrap_err() {
            ConfigError::Invalid(msg) => assert!(msg.contains("BNET_CLIENT_ID")),
            _ => panic!("wrong error"),
        }

        let cfg = load_with(
            Some(&p),
            env(&[("BNET_CLIENT_ID", "id"), ("BNET_CLIENT_SECRET", "hunter2")]),
        )
        .unwrap();
        let creds = cfg.require_credentials().unwrap();
        assert_eq!(creds.client_id, "id");
        assert!(!format!("{creds:?}").contains("hunter2"));
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[test]
    fn unknown_region_falls_back_to_us() {
        assert_eq!(Region::parse_lossy("mars"), Region::Us);
        assert_eq!(Region::parse_lossy(" KR "), Region::Kr);
        assert_eq!(Region::Cn.api_host(), "https://gateway.battlenet.com.cn");
    }

    #[test]
    fn ensure_dirs_creates_out_dir() {
        let td = tempdir().unwrap();
        let out = td.path().join("out");
        let mut cfg = Config::default();
        cfg.app.out_dir = out.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(out.exists());
    }
}
