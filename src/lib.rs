pub mod config;
pub mod fetch;
pub mod handlers;
pub mod models;
pub mod state;
pub mod tools;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use utoipa::OpenApi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Watchtower backend",
        description = "Tool endpoint that turns search and hidden-service lookups into cited text reports"
    ),
    paths(
        handlers::mcp::invoke_tool,
        handlers::system::health,
        handlers::system::readiness,
    ),
    components(schemas(
        models::ToolRequest,
        models::Report,
        models::SourceRecord,
        models::ErrorResponse,
        models::HealthResponse,
    )),
    tags(
        (name = "tools", description = "Tool invocation"),
        (name = "health", description = "Liveness and readiness"),
    )
)]
pub struct ApiDoc;

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can drive the app with a stub
/// fetcher without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS, set on every response including errors and pre-flight.
    let allow_origin: SetResponseHeaderLayer<HeaderValue> = SetResponseHeaderLayer::overriding(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    let allow_methods: SetResponseHeaderLayer<HeaderValue> = SetResponseHeaderLayer::overriding(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    let allow_headers: SetResponseHeaderLayer<HeaderValue> = SetResponseHeaderLayer::overriding(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    let body_limit = state.config.max_body_bytes;

    Router::new()
        // Health
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::readiness))
        // Tools
        .route(
            "/api/mcp",
            post(handlers::invoke_tool)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(allow_origin)
        .layer(allow_methods)
        .layer(allow_headers)
        .with_state(state)
}
