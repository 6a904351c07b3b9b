// ---------------------------------------------------------------------------
// handlers/ — HTTP surface
// Sub-modules for logical grouping; mod.rs re-exports the handlers so that
// `crate::handlers::*` paths stay flat for the router.
// ---------------------------------------------------------------------------

pub(crate) mod mcp;
pub(crate) mod system;

pub use mcp::{invoke_tool, method_not_allowed, preflight};
pub use system::{health, readiness};

use axum::http::StatusCode;
use axum::Json;

use crate::models::ErrorResponse;
use crate::tools::ToolError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// API error type for all handlers.
/// Logs full details server-side, returns a sanitized `{ "error": "..." }`
/// body to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream fetch error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),
}

impl ApiError {
    /// HTTP status code for each variant.
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Message safe to return to clients. Client errors pass through; server
    /// errors are replaced by a generic message.
    fn sanitized_message(&self) -> String {
        match self {
            ApiError::BadRequest(m) => m.clone(),
            ApiError::Upstream(_) => "Upstream fetch failed".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
            ApiError::MethodNotAllowed(_) => "Method Not Allowed".to_string(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("API error ({}): {}", status.as_u16(), self);
        } else {
            tracing::warn!("API error ({}): {}", status.as_u16(), self);
        }

        let body = ErrorResponse { error: self.sanitized_message() };
        (status, Json(body)).into_response()
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            e @ ToolError::UnknownTool(_) => ApiError::BadRequest(e.to_string()),
            ToolError::UpstreamFetchFailed(e) => ApiError::Upstream(e.to_string()),
            ToolError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
