use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Tool invocation
// ---------------------------------------------------------------------------

/// Body of `POST /api/mcp` as documented in the OpenAPI schema. The handler
/// reads the raw JSON and validates `tool` / `params` itself, so a missing
/// field maps to a 400 with `{ "error": ... }` rather than an extractor rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolRequest {
    /// Tool identifier, e.g. `call_watchtower`.
    #[schema(example = "call_social_cartographer")]
    pub tool: String,
    /// Tool parameters (`target_name`, `mission_type`, `query`).
    #[schema(value_type = Object)]
    pub params: Value,
}

/// A single citation. `snippet` is only present for search-result records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SourceRecord {
    pub title: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Tool result returned with status 200. `text` is always populated, even when
/// the upstream fetch failed and `sources` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Report {
    pub text: String,
    pub sources: Vec<SourceRecord>,
}

/// Error body for 4xx / 5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub app: String,
    pub uptime_seconds: u64,
    /// Active document fetcher strategy (`http` or `browser`).
    pub fetcher: String,
}
