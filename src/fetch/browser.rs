//! Headless-browser strategy (feature `browser`).
//!
//! Each fetch launches its own Chromium, navigates to the target, polls for a
//! structural marker and reads the rendered DOM. The browser process and its
//! CDP event-handler task live only for the duration of one `fetch` call and
//! are torn down on every exit path, including marker timeouts.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{DocumentFetcher, FetchError, DESKTOP_USER_AGENT};
use crate::tools::{ExtractionMode, ResolvedTarget};

/// How long to wait for the marker after navigation.
pub const MARKER_TIMEOUT: Duration = Duration::from_secs(10);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Element whose presence means the page has rendered enough to extract.
pub fn marker_for(mode: ExtractionMode) -> &'static str {
    match mode {
        ExtractionMode::SearchResults => "div.g",
        ExtractionMode::GenericPage => "body",
    }
}

pub struct BrowserFetcher {
    chrome_path: Option<PathBuf>,
}

impl BrowserFetcher {
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>), FetchError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(NAVIGATION_TIMEOUT)
            .window_size(1920, 1080)
            .no_sandbox()
            .arg(format!("--user-agent={}", DESKTOP_USER_AGENT))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--no-first-run")
            .arg("--mute-audio");
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(format!("launch failed: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {:?}", e);
                }
            }
        });

        Ok((browser, handler_task))
    }

    async fn render(browser: &Browser, target: &ResolvedTarget) -> Result<String, FetchError> {
        let page = browser
            .new_page(target.url.as_str())
            .await
            .map_err(|e| FetchError::Browser(format!("navigation failed: {}", e)))?;

        let marker = marker_for(target.mode);
        let started = Instant::now();
        loop {
            if page.find_element(marker).await.is_ok() {
                tracing::debug!(
                    marker,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "browser: marker present"
                );
                break;
            }
            if started.elapsed() >= MARKER_TIMEOUT {
                tracing::warn!(url = %target.url, marker, "browser: marker never appeared");
                return Err(FetchError::Timeout(MARKER_TIMEOUT));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        page.content()
            .await
            .map_err(|e| FetchError::Browser(format!("reading DOM failed: {}", e)))
    }
}

#[async_trait]
impl DocumentFetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, target: &ResolvedTarget) -> Result<String, FetchError> {
        let (mut browser, handler_task) = self.launch().await?;

        let result = Self::render(&browser, target).await;

        if let Err(e) = browser.close().await {
            tracing::warn!("browser: close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            tracing::warn!("browser: wait for exit failed: {}", e);
        }
        handler_task.abort();

        result
    }
}
