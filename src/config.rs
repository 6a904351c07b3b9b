// Watchtower backend — runtime configuration
//
// Read once at startup from the process environment (after `dotenvy` has
// loaded `.env`). Every field has a default so a bare `cargo run` works.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use url::Url;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_SEARCH_ENGINE_URL: &str = "https://www.google.com/search";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Which `DocumentFetcher` implementation serves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    Http,
    Browser,
}

impl FetchBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchBackend::Http => "http",
            FetchBackend::Browser => "browser",
        }
    }
}

impl FromStr for FetchBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(FetchBackend::Http),
            "browser" | "headless" => Ok(FetchBackend::Browser),
            other => Err(anyhow!("unknown fetch backend '{}' (expected http|browser)", other)),
        }
    }
}

/// What the dispatcher does when the upstream fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Return a 200 report whose text explains the failure, with no sources.
    Absorb,
    /// Surface the failure as a 502.
    Propagate,
}

impl FromStr for FetchFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absorb" => Ok(FetchFailurePolicy::Absorb),
            "propagate" => Ok(FetchFailurePolicy::Propagate),
            other => Err(anyhow!(
                "unknown fetch failure policy '{}' (expected absorb|propagate)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL that search queries are appended to as `?q=`.
    pub search_engine_url: Url,
    pub fetch_backend: FetchBackend,
    /// Transport timeout for the HTTP fetcher.
    pub fetch_timeout: Duration,
    pub fetch_failure_policy: FetchFailurePolicy,
    /// Chromium executable for the browser fetcher; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            search_engine_url: Url::parse(DEFAULT_SEARCH_ENGINE_URL)
                .expect("default search engine URL is valid"),
            fetch_backend: FetchBackend::Http,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_failure_policy: FetchFailurePolicy::Absorb,
            chrome_path: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Config::default();

        if let Some(v) = get("PORT") {
            cfg.port = v.trim().parse().with_context(|| format!("invalid PORT '{}'", v))?;
        }
        if let Some(v) = get("SEARCH_ENGINE_URL") {
            let url = Url::parse(v.trim())
                .with_context(|| format!("invalid SEARCH_ENGINE_URL '{}'", v))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(anyhow!("SEARCH_ENGINE_URL must be http or https, got '{}'", v));
            }
            cfg.search_engine_url = url;
        }
        if let Some(v) = get("FETCH_BACKEND") {
            cfg.fetch_backend = v.parse()?;
        }
        if let Some(v) = get("FETCH_TIMEOUT_SECS") {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("invalid FETCH_TIMEOUT_SECS '{}'", v))?;
            if secs == 0 {
                return Err(anyhow!("FETCH_TIMEOUT_SECS must be greater than zero"));
            }
            cfg.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("FETCH_FAILURE_POLICY") {
            cfg.fetch_failure_policy = v.parse()?;
        }
        if let Some(v) = get("CHROME_PATH") {
            cfg.chrome_path = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("MAX_BODY_BYTES") {
            cfg.max_body_bytes = v
                .trim()
                .parse()
                .with_context(|| format!("invalid MAX_BODY_BYTES '{}'", v))?;
        }

        Ok(cfg)
    }
}
