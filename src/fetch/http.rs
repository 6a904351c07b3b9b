//! Direct HTTP strategy: a single `reqwest` GET per request.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::redirect::Policy;

use super::{DocumentFetcher, FetchError, DESKTOP_USER_AGENT};
use crate::tools::ResolvedTarget;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .redirect(Policy::default())
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, target: &ResolvedTarget) -> Result<String, FetchError> {
        let started = Instant::now();
        let resp = self
            .client
            .get(target.url.as_str())
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %target.url, status = status.as_u16(), "fetch: non-success status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        tracing::debug!(
            url = %target.url,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetch: document retrieved"
        );
        Ok(body)
    }
}

impl HttpFetcher {
    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(e.to_string())
        }
    }
}
