//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use aside_api::{create_api_router, ApiConfig, AppState, X_CACHE};
use aside_core::{decode_pages, ResolverConfig, WritePolicy};
use aside_test_utils::{
    search_pages, CacheKey, CacheStore, CountingProducer, FlakyStore, InMemoryStore, PageLimits,
    ScriptedPagedProducer, StoreKind, UpstreamError,
};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const URL: &str = "https://example.com/feed.xml";

struct Harness {
    store: Arc<FlakyStore>,
    fetcher: Arc<CountingProducer>,
    searcher: Arc<ScriptedPagedProducer>,
    app: Router,
}

impl Harness {
    fn new(fetcher: CountingProducer, searcher: ScriptedPagedProducer) -> Self {
        Self::with_config(fetcher, searcher, ResolverConfig::default(), ApiConfig::default())
    }

    fn with_config(
        fetcher: CountingProducer,
        searcher: ScriptedPagedProducer,
        resolver: ResolverConfig,
        api: ApiConfig,
    ) -> Self {
        let store = Arc::new(FlakyStore::new(StoreKind::Transactional));
        let fetcher = Arc::new(fetcher);
        let searcher = Arc::new(searcher);
        let state = AppState::new(store.clone(), resolver, fetcher.clone(), searcher.clone());
        Self {
            store,
            fetcher,
            searcher,
            app: create_api_router(state, &api),
        }
    }

    fn default_producers() -> Self {
        Self::new(
            CountingProducer::ok("<rss>hello</rss>"),
            ScriptedPagedProducer::with_pages(search_pages("golang concurrency", 3, 5)),
        )
    }

    async fn send(&self, method: Method, uri: &str, body: Body) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)?;
        Ok(self.app.clone().oneshot(request).await?)
    }

    async fn post_json(&self, uri: &str, body: Value) -> Result<Response, Box<dyn std::error::Error>> {
        self.send(Method::POST, uri, Body::from(body.to_string())).await
    }
}

async fn body_bytes(response: Response) -> Result<Vec<u8>, axum::Error> {
    Ok(axum::body::to_bytes(response.into_body(), usize::MAX).await?.to_vec())
}

async fn body_json(response: Response) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::from_slice(&body_bytes(response).await?)?)
}

fn cache_header(response: &Response) -> Option<&str> {
    response.headers().get(X_CACHE).and_then(|v| v.to_str().ok())
}

// ============================================================================
// FETCH
// ============================================================================

#[tokio::test]
async fn test_fetch_miss_then_hit() -> TestResult {
    let harness = Harness::default_producers();

    let first = harness.post_json("/fetch", json!({ "url": URL })).await?;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_header(&first), Some("miss"));
    assert_eq!(body_bytes(first).await?, b"<rss>hello</rss>".to_vec());

    let second = harness.post_json("/fetch", json!({ "url": URL })).await?;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(cache_header(&second), Some("hit"));
    assert_eq!(body_bytes(second).await?, b"<rss>hello</rss>".to_vec());

    assert_eq!(harness.fetcher.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_fetch_malformed_json_is_bad_request() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness
        .send(Method::POST, "/fetch", Body::from("{\"url\": "))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await?["code"], "INVALID_INPUT");
    assert_eq!(harness.fetcher.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_fetch_empty_url_is_bad_request() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness.post_json("/fetch", json!({ "url": "  " })).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await?["code"], "MISSING_FIELD");
    Ok(())
}

#[tokio::test]
async fn test_fetch_upstream_status_is_surfaced_and_not_cached() -> TestResult {
    let harness = Harness::new(
        CountingProducer::failing(UpstreamError::status(404, "404 Not Found")),
        ScriptedPagedProducer::with_pages(Vec::new()),
    );

    let response = harness.post_json("/fetch", json!({ "url": URL })).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await?;
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert_eq!(body["message"], "404 Not Found");
    assert_eq!(body["details"]["upstream_status"], 404);

    assert_eq!(harness.store.set_attempts(), 0);
    assert_eq!(harness.store.peek(&CacheKey::fetch(URL)).await, None);
    Ok(())
}

#[tokio::test]
async fn test_fetch_survives_unavailable_store() -> TestResult {
    let harness = Harness::default_producers();
    harness.store.fail_reads(true);
    harness.store.fail_writes(true);

    let response = harness.post_json("/fetch", json!({ "url": URL })).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_header(&response), Some("miss"));
    assert_eq!(harness.store.set_attempts(), 1);
    Ok(())
}

#[tokio::test]
async fn test_durable_write_failure_is_server_error() -> TestResult {
    let harness = Harness::with_config(
        CountingProducer::ok("body"),
        ScriptedPagedProducer::with_pages(Vec::new()),
        ResolverConfig::new().with_write_policy(WritePolicy::Durable),
        ApiConfig::default(),
    );
    harness.store.fail_writes(true);

    let response = harness.post_json("/fetch", json!({ "url": URL })).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await?["code"], "STORE_ERROR");
    Ok(())
}

// ============================================================================
// SEARCH
// ============================================================================

#[tokio::test]
async fn test_search_defaults_then_hit() -> TestResult {
    let harness = Harness::default_producers();

    let first = harness
        .post_json("/search", json!({ "keywords": "golang concurrency" }))
        .await?;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_header(&first), Some("miss"));
    assert_eq!(
        first.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let first_body = body_bytes(first).await?;

    assert_eq!(
        harness.searcher.last_limits(),
        Some(PageLimits {
            max_per_page: 5,
            max_pages: 1
        })
    );
    let pages = decode_pages(&first_body)?;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].items.len(), 5);

    let second = harness
        .post_json("/search", json!({ "keywords": "golang concurrency", "max_pages": 3 }))
        .await?;
    assert_eq!(cache_header(&second), Some("hit"));
    assert_eq!(body_bytes(second).await?, first_body);
    assert_eq!(harness.searcher.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_search_two_pages() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness
        .post_json(
            "/search",
            json!({ "keywords": "golang concurrency", "max_per_page": 5, "max_pages": 2 }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let pages = decode_pages(&body_bytes(response).await?)?;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages.iter().map(|p| p.items.len()).sum::<usize>(), 10);
    assert_eq!(pages[1].items[0]["id"], "golang concurrency-1-0");
    Ok(())
}

#[tokio::test]
async fn test_search_requires_keywords() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness.post_json("/search", json!({ "max_pages": 2 })).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.searcher.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_search_request_failure_is_server_error() -> TestResult {
    let harness = Harness::new(
        CountingProducer::ok("unused"),
        ScriptedPagedProducer::failing(UpstreamError::status(403, "403 Forbidden")),
    );

    let response = harness
        .post_json("/search", json!({ "keywords": "quota" }))
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await?;
    assert_eq!(body["message"], "403 Forbidden");
    assert_eq!(body["details"]["upstream_status"], 403);
    assert_eq!(harness.store.peek(&CacheKey::search("quota")).await, None);
    Ok(())
}

#[tokio::test]
async fn test_oversized_body_is_rejected() -> TestResult {
    let api = ApiConfig {
        max_body_bytes: 64,
        ..ApiConfig::default()
    };
    let harness = Harness::with_config(
        CountingProducer::ok("unused"),
        ScriptedPagedProducer::with_pages(Vec::new()),
        ResolverConfig::default(),
        api,
    );

    let keywords = "x".repeat(1024);
    let response = harness
        .post_json("/search", json!({ "keywords": keywords }))
        .await?;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(harness.searcher.calls(), 0);
    Ok(())
}

// ============================================================================
// CACHE ADMINISTRATION
// ============================================================================

#[tokio::test]
async fn test_invalidate_entry() -> TestResult {
    let harness = Harness::default_producers();
    harness
        .store
        .seed(&CacheKey::search("golang concurrency"), b"[]")
        .await?;

    let body = json!({ "key": "golang concurrency" }).to_string();
    let response = harness
        .send(Method::DELETE, "/cache/search", Body::from(body.clone()))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?, json!({ "deleted": true }));

    let response = harness
        .send(Method::DELETE, "/cache/search", Body::from(body))
        .await?;
    assert_eq!(body_json(response).await?, json!({ "deleted": false }));
    Ok(())
}

#[tokio::test]
async fn test_invalidate_unknown_namespace() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness
        .send(
            Method::DELETE,
            "/cache/videos",
            Body::from(json!({ "key": "x" }).to_string()),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await?["code"], "INVALID_FORMAT");
    Ok(())
}

#[tokio::test]
async fn test_invalidate_store_failure_is_server_error() -> TestResult {
    let harness = Harness::default_producers();
    harness.store.fail_writes(true);

    let response = harness
        .send(
            Method::DELETE,
            "/cache/fetch",
            Body::from(json!({ "key": URL }).to_string()),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await?["code"], "STORE_ERROR");
    Ok(())
}

#[tokio::test]
async fn test_cache_stats() -> TestResult {
    let harness = Harness::default_producers();
    harness.post_json("/fetch", json!({ "url": URL })).await?;
    harness.post_json("/fetch", json!({ "url": URL })).await?;

    let response = harness
        .send(Method::GET, "/cache/stats", Body::empty())
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["store"]["kind"], "transactional");
    assert_eq!(body["store"]["writes"], 1);
    assert_eq!(body["resolver"]["hits"], 1);
    assert_eq!(body["resolver"]["misses"], 1);
    assert_eq!(body["in_flight"], 0);
    Ok(())
}

// ============================================================================
// HEALTH & METRICS
// ============================================================================

#[tokio::test]
async fn test_health_ping_and_live() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness.send(Method::GET, "/health/ping", Body::empty()).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await?, b"pong".to_vec());

    let response = harness.send(Method::GET, "/health/live", Body::empty()).await?;
    assert_eq!(body_json(response).await?["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_readiness_follows_store() -> TestResult {
    let harness = Harness::default_producers();

    let response = harness.send(Method::GET, "/health/ready", Body::empty()).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["kind"], "transactional");

    harness.store.fail_reads(true);
    let response = harness.send(Method::GET, "/health/ready", Body::empty()).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await?["status"], "unhealthy");
    Ok(())
}

#[tokio::test]
async fn test_readiness_on_plain_memory_store() -> TestResult {
    let store: Arc<dyn CacheStore> = Arc::new(InMemoryStore::new());
    let state = AppState::new(
        store,
        ResolverConfig::default(),
        Arc::new(CountingProducer::ok("unused")),
        Arc::new(ScriptedPagedProducer::with_pages(Vec::new())),
    );
    let app = create_api_router(state, &ApiConfig::default());

    let request = Request::builder().uri("/health/ready").body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint() -> TestResult {
    let harness = Harness::default_producers();
    harness.post_json("/fetch", json!({ "url": URL })).await?;

    let response = harness.send(Method::GET, "/metrics", Body::empty()).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let text = String::from_utf8(body_bytes(response).await?)?;
    assert!(text.contains("aside_resolutions_total"));
    assert!(text.contains("aside_http_requests_total"));
    assert!(text.contains("aside_cache_write_failures_total"));
    Ok(())
}
