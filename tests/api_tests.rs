use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use watchtower_backend::config::{Config, FetchFailurePolicy};
use watchtower_backend::fetch::{DocumentFetcher, FetchError};
use watchtower_backend::state::AppState;
use watchtower_backend::tools::ResolvedTarget;

/// Fetcher that returns a canned response and records what it was asked for.
struct StubFetcher {
    response: Result<String, FetchError>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn html(html: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(html.into()),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: FetchError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(err),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_url(&self) -> Option<String> {
        self.urls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DocumentFetcher for StubFetcher {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch(&self, target: &ResolvedTarget) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(target.url.to_string());
        self.response.clone()
    }
}

fn app_with(fetcher: Arc<StubFetcher>, config: Config) -> axum::Router {
    let state = AppState::new(config, fetcher);
    watchtower_backend::create_router(state)
}

fn app(fetcher: Arc<StubFetcher>) -> axum::Router {
    app_with(fetcher, Config::default())
}

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper: collect a response body into a serde_json::Value.
async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn results_page(count: usize) -> String {
    let blocks: String = (1..=count)
        .map(|n| {
            format!(
                r#"<div class="g"><a href="https://site{n}.example/"><h3>Result {n}</h3></a><div class="VwiC3b">Snippet {n}</div></div>"#
            )
        })
        .collect();
    format!("<html><head><title>Search</title></head><body><div id=\"search\">{blocks}</div></body></html>")
}

fn query_param(url: &str) -> String {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
//  POST /api/mcp — search tools
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn relationship_mapping_builds_query_and_reports_sources() {
    let fetcher = StubFetcher::html(results_page(2));
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({
            "tool": "call_social_cartographer",
            "params": { "target_name": "Jane Doe" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.calls(), 1);
    let url = fetcher.last_url().unwrap();
    assert!(url.starts_with("https://www.google.com/search?q="));
    assert_eq!(
        query_param(&url),
        "professional relationships and social network graph for \"Jane Doe\""
    );

    let json = body_json(response).await;
    let text = json["text"].as_str().unwrap();
    assert!(text.starts_with(
        "Intelligence report based on top search results for query: \"professional relationships and social network graph for \"Jane Doe\"\""
    ));
    assert!(text.contains("[Source 1: Result 1]\nSnippet: Snippet 1"));
    assert!(text.contains("[Source 2: Result 2]\nSnippet: Snippet 2"));

    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["title"], "Result 1");
    assert_eq!(sources[0]["uri"], "https://site1.example/");
    assert_eq!(sources[0]["snippet"], "Snippet 1");
}

#[tokio::test]
async fn search_results_are_capped_at_five() {
    let fetcher = StubFetcher::html(results_page(8));
    let response = app(fetcher)
        .oneshot(post_json(&json!({
            "tool": "call_watchtower",
            "params": { "target_name": "Acme Corp" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let titles: Vec<&str> = json["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Result 1", "Result 2", "Result 3", "Result 4", "Result 5"]);
}

#[tokio::test]
async fn mission_template_is_used_for_search() {
    let fetcher = StubFetcher::html(results_page(0));
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({
            "tool": "veiled_mirror_query",
            "params": { "mission_type": "threat_intelligence", "query": "acme" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        query_param(&fetcher.last_url().unwrap()),
        "cybersecurity report dark web zero-day exploit for \"acme\""
    );
    let json = body_json(response).await;
    assert_eq!(
        json["text"],
        "Intelligence report based on top search results for query: \"cybersecurity report dark web zero-day exploit for \"acme\"\""
    );
    assert_eq!(json["sources"], json!([]));
}

#[tokio::test]
async fn search_engine_url_is_configurable() {
    let fetcher = StubFetcher::html(results_page(0));
    let config = Config {
        search_engine_url: url::Url::parse("https://search.example.org/find").unwrap(),
        ..Config::default()
    };
    let response = app_with(fetcher.clone(), config)
        .oneshot(post_json(&json!({
            "tool": "call_watchtower",
            "params": { "target_name": "Acme" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.last_url().unwrap(), "https://search.example.org/find?q=Acme");
}

// ═══════════════════════════════════════════════════════════════════════════
//  POST /api/mcp — hidden-service browse
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn onion_browse_reads_page_through_gateway() {
    let fetcher = StubFetcher::html(
        "<html><head><title>Hidden Wiki</title></head><body><nav>x</nav><main>Welcome   to the\n\n\nwiki</main></body></html>",
    );
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({
            "tool": "veiled_mirror_query",
            "params": { "mission_type": "onion_browse", "query": "xyz123.onion" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.last_url().unwrap(), "https://xyz123.onion.ly/");

    let json = body_json(response).await;
    assert_eq!(
        json["text"],
        "Raw text content from https://xyz123.onion.ly/:\n\nWelcome to the wiki"
    );
    assert_eq!(
        json["sources"],
        json!([{ "title": "Hidden Wiki", "uri": "https://xyz123.onion.ly/" }])
    );
}

#[tokio::test]
async fn onion_browse_rejects_non_onion_address_before_fetch() {
    let fetcher = StubFetcher::html("<html></html>");
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({
            "tool": "veiled_mirror_query",
            "params": { "mission_type": "onion_browse", "query": "xyz123.com" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fetcher.calls(), 0);
    let json = body_json(response).await;
    assert_eq!(json, json!({ "error": "Invalid .onion address provided." }));
}

// ═══════════════════════════════════════════════════════════════════════════
//  POST /api/mcp — validation
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unknown_tool_is_rejected_without_fetch() {
    let fetcher = StubFetcher::html("<html></html>");
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({ "tool": "call_oracle", "params": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fetcher.calls(), 0);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Unknown tool: call_oracle");
}

#[tokio::test]
async fn missing_tool_or_params_is_rejected() {
    for body in [
        json!({ "params": { "target_name": "Acme" } }),
        json!({ "tool": "call_watchtower" }),
    ] {
        let fetcher = StubFetcher::html("<html></html>");
        let response = app(fetcher.clone()).oneshot(post_json(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fetcher.calls(), 0);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Missing tool or params in request body");
    }
}

#[tokio::test]
async fn missing_required_param_is_rejected() {
    let fetcher = StubFetcher::html("<html></html>");
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({ "tool": "call_watchtower", "params": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fetcher.calls(), 0);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("target_name"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let fetcher = StubFetcher::html("<html></html>");
    let request = Request::builder()
        .method("POST")
        .uri("/api/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app(fetcher).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

// ═══════════════════════════════════════════════════════════════════════════
//  POST /api/mcp — upstream failures
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn fetch_failure_is_absorbed_into_report() {
    let fetcher = StubFetcher::failing(FetchError::Status(503));
    let response = app(fetcher.clone())
        .oneshot(post_json(&json!({
            "tool": "call_watchtower",
            "params": { "target_name": "Acme" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.calls(), 1);
    let json = body_json(response).await;
    assert_eq!(json["sources"], json!([]));
    let text = json["text"].as_str().unwrap();
    assert!(!text.is_empty());
    assert!(text.contains("503"));
}

#[tokio::test]
async fn fetch_failure_propagates_when_configured() {
    let fetcher = StubFetcher::failing(FetchError::Network("connection refused".into()));
    let config = Config {
        fetch_failure_policy: FetchFailurePolicy::Propagate,
        ..Config::default()
    };
    let response = app_with(fetcher, config)
        .oneshot(post_json(&json!({
            "tool": "call_watchtower",
            "params": { "target_name": "Acme" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Upstream fetch failed");
}

// ═══════════════════════════════════════════════════════════════════════════
//  Methods and CORS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn options_preflight_is_empty_200_with_cors_headers() {
    let fetcher = StubFetcher::html("<html></html>");
    let response = app(fetcher.clone())
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/mcp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.calls(), 0);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    for method in ["GET", "PUT", "DELETE"] {
        let response = app(StubFetcher::html("<html></html>"))
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/api/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let json = body_json(response).await;
        assert_eq!(json, json!({ "error": "Method Not Allowed" }));
    }
}

#[tokio::test]
async fn error_responses_carry_cors_headers() {
    let response = app(StubFetcher::html("<html></html>"))
        .oneshot(post_json(&json!({ "tool": "call_oracle", "params": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
