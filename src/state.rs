// Watchtower backend — application state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::fetch::DocumentFetcher;

/// Central application state. Clone-friendly: everything shared sits behind
/// an `Arc`. Nothing here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn DocumentFetcher>,
    pub start_time: Instant,
    /// `true` once the listener is bound.
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Config, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        tracing::info!(
            "AppState initialised — backend: {} ({}), search engine: {}, on fetch failure: {:?}",
            config.fetch_backend.as_str(),
            fetcher.name(),
            config.search_engine_url,
            config.fetch_failure_policy,
        );
        Self {
            config: Arc::new(config),
            fetcher,
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Backend marked as READY");
    }
}
