//! HTTP producers against a local mock upstream.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aside_core::{drain_pages, CacheKey, PageLimits, PagedProducer, Producer};
use aside_producer::{HttpFetcher, HttpSearchClient};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::json;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Default)]
struct Upstream {
    search_requests: AtomicUsize,
    last_query: Mutex<HashMap<String, String>>,
}

/// Three pages chained by tokens; items sized by `maxResults`.
async fn search_handler(
    State(upstream): State<Arc<Upstream>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    upstream.search_requests.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut last) = upstream.last_query.lock() {
        *last = params.clone();
    }

    let per_page: usize = params
        .get("maxResults")
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);
    let (page, next) = match params.get("pageToken").map(String::as_str) {
        None => (0, Some("p1")),
        Some("p1") => (1, Some("p2")),
        Some("p2") => (2, None),
        Some(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    let items: Vec<_> = (0..per_page)
        .map(|n| json!({ "id": format!("{}-{}-{}", params["q"], page, n) }))
        .collect();
    Json(json!({ "nextPageToken": next, "items": items })).into_response()
}

/// First page succeeds, the second fails.
async fn flaky_search_handler(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("pageToken") {
        None => Json(json!({ "nextPageToken": "p1", "items": [{ "id": 0 }] })).into_response(),
        Some(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn spawn_upstream() -> Result<(SocketAddr, Arc<Upstream>), std::io::Error> {
    let upstream = Arc::new(Upstream::default());
    let app = Router::new()
        .route("/ok", get(|| async { "hello, aside" }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/search", get(search_handler))
        .route("/flaky-search", get(flaky_search_handler))
        .route(
            "/broken-search",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .with_state(Arc::clone(&upstream));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, upstream))
}

fn search_client(addr: SocketAddr, path: &str) -> Result<HttpSearchClient, aside_core::UpstreamError> {
    HttpSearchClient::new(
        format!("http://{}{}", addr, path),
        Some("test-key".to_string()),
        Duration::from_secs(5),
    )
}

// ============================================================================
// FETCH
// ============================================================================

#[tokio::test]
async fn test_fetch_returns_body() -> TestResult {
    let (addr, _) = spawn_upstream().await?;
    let fetcher = HttpFetcher::new(Duration::from_secs(5))?;

    let body = fetcher
        .produce(&CacheKey::fetch(format!("http://{}/ok", addr)))
        .await?;
    assert_eq!(body, b"hello, aside".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_fetch_forwards_status() -> TestResult {
    let (addr, _) = spawn_upstream().await?;
    let fetcher = HttpFetcher::new(Duration::from_secs(5))?;

    let err = fetcher
        .produce(&CacheKey::fetch(format!("http://{}/missing", addr)))
        .await
        .err()
        .ok_or("expected an upstream error")?;

    assert_eq!(err.status, Some(404));
    assert_eq!(err.message, "404 Not Found");
    Ok(())
}

#[tokio::test]
async fn test_fetch_transport_error_has_no_status() -> TestResult {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let fetcher = HttpFetcher::new(Duration::from_secs(2))?;
    let err = fetcher
        .produce(&CacheKey::fetch(format!("http://{}/gone", addr)))
        .await
        .err()
        .ok_or("expected a transport error")?;

    assert_eq!(err.status, None);
    Ok(())
}

#[tokio::test]
async fn test_fetch_rejects_malformed_url() -> TestResult {
    let fetcher = HttpFetcher::new(Duration::from_secs(2))?;
    let result = fetcher.produce(&CacheKey::fetch("not a url")).await;
    assert!(matches!(result, Err(e) if e.status.is_none()));
    Ok(())
}

// ============================================================================
// SEARCH
// ============================================================================

#[tokio::test]
async fn test_search_respects_max_pages() -> TestResult {
    let (addr, upstream) = spawn_upstream().await?;
    let client = search_client(addr, "/search")?;
    let limits = PageLimits {
        max_per_page: 5,
        max_pages: 2,
    };

    let stream = client
        .search(&CacheKey::search("golang concurrency"), limits)
        .await?;
    let pages = drain_pages(stream).await?;

    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.items.len() == 5));
    assert_eq!(pages[0].page_token, None);
    assert_eq!(pages[1].page_token.as_deref(), Some("p1"));
    assert_eq!(pages[1].items[0]["id"], "golang concurrency-1-0");
    assert_eq!(upstream.search_requests.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_search_stops_when_upstream_runs_out() -> TestResult {
    let (addr, upstream) = spawn_upstream().await?;
    let client = search_client(addr, "/search")?;
    let limits = PageLimits {
        max_per_page: 1,
        max_pages: 10,
    };

    let pages = drain_pages(client.search(&CacheKey::search("rust"), limits).await?).await?;

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[2].next_page_token, None);
    assert_eq!(upstream.search_requests.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn test_search_first_page_is_eager_and_rest_lazy() -> TestResult {
    let (addr, upstream) = spawn_upstream().await?;
    let client = search_client(addr, "/search")?;
    let limits = PageLimits {
        max_per_page: 2,
        max_pages: 3,
    };

    let mut stream = client.search(&CacheKey::search("lazy"), limits).await?;
    assert_eq!(upstream.search_requests.load(Ordering::SeqCst), 1);

    let first = stream.next().await.ok_or("stream ended early")??;
    assert_eq!(first.items.len(), 2);
    assert_eq!(upstream.search_requests.load(Ordering::SeqCst), 1);

    stream.next().await.ok_or("stream ended early")??;
    assert_eq!(upstream.search_requests.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_search_forwards_query_parameters() -> TestResult {
    let (addr, upstream) = spawn_upstream().await?;
    let client = search_client(addr, "/search")?;

    client
        .search(&CacheKey::search("Mixed Case  query"), PageLimits::default())
        .await?;

    let last = upstream
        .last_query
        .lock()
        .map_err(|_| "upstream state poisoned")?
        .clone();
    assert_eq!(last.get("part").map(String::as_str), Some("snippet"));
    assert_eq!(last.get("q").map(String::as_str), Some("Mixed Case  query"));
    assert_eq!(last.get("maxResults").map(String::as_str), Some("5"));
    assert_eq!(last.get("key").map(String::as_str), Some("test-key"));
    assert!(!last.contains_key("pageToken"));
    Ok(())
}

#[tokio::test]
async fn test_search_request_failure_fails_call() -> TestResult {
    let (addr, _) = spawn_upstream().await?;
    let client = search_client(addr, "/broken-search")?;

    let err = client
        .search(&CacheKey::search("anything"), PageLimits::default())
        .await
        .err()
        .ok_or("expected the first page to fail")?;

    assert_eq!(err.status, Some(500));
    Ok(())
}

#[tokio::test]
async fn test_search_mid_stream_failure_is_yielded() -> TestResult {
    let (addr, _) = spawn_upstream().await?;
    let client = search_client(addr, "/flaky-search")?;
    let limits = PageLimits {
        max_per_page: 1,
        max_pages: 5,
    };

    let mut stream = client.search(&CacheKey::search("flaky"), limits).await?;
    assert!(matches!(stream.next().await, Some(Ok(_))));
    match stream.next().await {
        Some(Err(e)) => assert_eq!(e.status, Some(503)),
        other => return Err(format!("expected a failed page, got {:?}", other).into()),
    }
    assert!(stream.next().await.is_none());
    Ok(())
}
