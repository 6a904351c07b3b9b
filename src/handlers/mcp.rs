// ---------------------------------------------------------------------------
// handlers/mcp.rs — POST /api/mcp tool endpoint
// ---------------------------------------------------------------------------

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::Json;
use serde_json::Value;

use crate::models::Report;
use crate::state::AppState;
use crate::tools;

use super::ApiError;

/// POST /api/mcp — run one tool invocation and return its report.
///
/// Upstream fetch failures still answer 200 with an explanatory `text` and no
/// sources unless `FETCH_FAILURE_POLICY=propagate`.
#[utoipa::path(post, path = "/api/mcp", tag = "tools",
    request_body = crate::models::ToolRequest,
    responses(
        (status = 200, description = "Tool report", body = Report),
        (status = 400, description = "Invalid request or unknown tool", body = crate::models::ErrorResponse),
        (status = 405, description = "Method not allowed", body = crate::models::ErrorResponse),
        (status = 500, description = "Internal error", body = crate::models::ErrorResponse),
        (status = 502, description = "Upstream fetch failed (propagate policy only)", body = crate::models::ErrorResponse)
    )
)]
pub async fn invoke_tool(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Report>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let report = tools::execute_tool(&body, &state).await?;
    Ok(Json(report))
}

/// OPTIONS /api/mcp — CORS pre-flight; headers come from the router layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any other method on /api/mcp.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}
