//! Document fetchers.
//!
//! The dispatcher only sees `DocumentFetcher`: given a resolved target it
//! returns raw HTML or a `FetchError`. Two strategies exist:
//! - `HttpFetcher`: one direct GET with a fixed desktop-browser identity
//! - `BrowserFetcher` (feature `browser`): headless Chromium that waits for a
//!   structural marker before reading the rendered DOM
//!
//! Neither strategy retries. One request, one attempt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, FetchBackend};
use crate::tools::ResolvedTarget;

#[cfg(feature = "browser")]
pub mod browser;
pub mod http;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use http::HttpFetcher;

/// Fixed `User-Agent` sent by the direct HTTP strategy (and the headless
/// browser). Upstream search pages serve a different, script-only layout to
/// unknown agents, so this string is part of the wire contract.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0.4844.84 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request failed with status: {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Short strategy name, reported by the health endpoint.
    fn name(&self) -> &'static str;

    /// Retrieve the document behind `target.url`.
    async fn fetch(&self, target: &ResolvedTarget) -> Result<String, FetchError>;
}

/// Build the fetcher selected by `FETCH_BACKEND`.
pub fn from_config(config: &Config) -> anyhow::Result<Arc<dyn DocumentFetcher>> {
    match config.fetch_backend {
        FetchBackend::Http => Ok(Arc::new(HttpFetcher::new(config.fetch_timeout)?)),
        #[cfg(feature = "browser")]
        FetchBackend::Browser => Ok(Arc::new(BrowserFetcher::new(config.chrome_path.clone()))),
        #[cfg(not(feature = "browser"))]
        FetchBackend::Browser => Err(anyhow::anyhow!(
            "FETCH_BACKEND=browser requires building with `--features browser`"
        )),
    }
}
