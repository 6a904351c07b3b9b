//! Tool dispatch.
//!
//! Three tools are served, all through the same pipeline:
//! - `call_watchtower`: entity lookup by raw name
//! - `veiled_mirror_query`: mission-templated search, or a hidden-service page
//!   read through the public gateway
//! - `call_social_cartographer`: relationship-mapping search
//!
//! `execute_tool` walks a request through
//! `Validating → Routing → Fetching → Extracting → Done`; any stage may end in
//! a `ToolError` instead. Exactly one fetch is attempted per request.

pub mod extract;
pub mod query_builder;
pub mod report;

use std::fmt;
use std::time::Instant;

use serde_json::Value;
use url::Url;

use crate::config::FetchFailurePolicy;
use crate::fetch::FetchError;
use crate::models::Report;
use crate::state::AppState;

pub use query_builder::{Route, Tool};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Missing or malformed input; the caller's fault.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetchFailed(#[from] FetchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    SearchResults,
    GenericPage,
}

/// Where to fetch and how to read the result. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: Url,
    pub mode: ExtractionMode,
    /// The search query in search-results mode, the page URL otherwise.
    pub query: String,
}

impl ResolvedTarget {
    pub fn from_route(route: Route, search_engine_url: &Url) -> Self {
        match route {
            Route::Search { query } => Self {
                url: query_builder::search_url(search_engine_url, &query),
                mode: ExtractionMode::SearchResults,
                query,
            },
            Route::Direct { url } => Self {
                query: url.to_string(),
                url,
                mode: ExtractionMode::GenericPage,
            },
        }
    }
}

/// Dispatcher stages, used for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Routing,
    Fetching,
    Extracting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validating => "validating",
            Stage::Routing => "routing",
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Done => "done",
        })
    }
}

const MISSING_FIELDS: &str = "Missing tool or params in request body";

/// Run one tool invocation from a raw `{ tool, params }` body.
pub async fn execute_tool(body: &Value, state: &AppState) -> Result<Report, ToolError> {
    let started = Instant::now();

    // Validating
    tracing::debug!(stage = %Stage::Validating, "tool request received");
    let (tool_name, params) = validate(body)?;

    // Routing
    tracing::debug!(stage = %Stage::Routing, tool = tool_name);
    let tool: Tool = tool_name.parse()?;
    let route = query_builder::build(tool, params)?;
    let target = ResolvedTarget::from_route(route, &state.config.search_engine_url);

    // Fetching
    tracing::info!(
        stage = %Stage::Fetching,
        tool = %tool,
        mode = ?target.mode,
        url = %target.url,
        fetcher = state.fetcher.name(),
        "fetching"
    );
    let html = match state.fetcher.fetch(&target).await {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(tool = %tool, url = %target.url, "upstream fetch failed: {}", err);
            return match state.config.fetch_failure_policy {
                FetchFailurePolicy::Absorb => Ok(report::fetch_failure_report(&target, &err)),
                FetchFailurePolicy::Propagate => Err(ToolError::UpstreamFetchFailed(err)),
            };
        }
    };

    // Extracting: HTML parsing is CPU-bound and `scraper::Html` is !Send, so it
    // runs on the blocking pool. A panic there surfaces as a JoinError.
    tracing::debug!(stage = %Stage::Extracting, bytes = html.len());
    let worker_target = target.clone();
    let report = tokio::task::spawn_blocking(move || {
        extract::extract(&html, &worker_target).map(|e| report::assemble(e, &worker_target))
    })
    .await
    .map_err(|e| ToolError::Internal(format!("extraction task failed: {}", e)))?
    .map_err(|e| ToolError::Internal(e.to_string()))?;

    tracing::info!(
        stage = %Stage::Done,
        tool = %tool,
        sources = report.sources.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "tool completed"
    );
    Ok(report)
}

/// Require a non-empty string `tool` and an object `params`.
fn validate(body: &Value) -> Result<(&str, &Value), ToolError> {
    let tool = body
        .get("tool")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ToolError::InvalidRequest(MISSING_FIELDS.to_string()))?;
    let params = body
        .get("params")
        .filter(|p| !p.is_null())
        .ok_or_else(|| ToolError::InvalidRequest(MISSING_FIELDS.to_string()))?;
    if !params.is_object() {
        return Err(ToolError::InvalidRequest("params must be a JSON object".to_string()));
    }
    Ok((tool, params))
}
