use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{TimeZone, Utc};
use listener_config::FirstDueConfig;
use listener_domain::DispatchSource;
use listener_errors::ListenerError;
use listener_infrastructure::FirstDueClient;
use serde_json::json;

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base_url: String) -> FirstDueConfig {
    FirstDueConfig {
        base_url,
        api_key: "test-key".to_string(),
        request_timeout_seconds: 5,
        page_size: 2,
        max_pages: 5,
    }
}

async fn paged_dispatches(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
        return (
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Json(json!({ "error": "unauthorized" })),
        );
    }
    recorded.requests.lock().unwrap().push(params.clone());

    let mut response_headers = HeaderMap::new();
    match params.get("page").map(String::as_str) {
        Some("1") => {
            response_headers.insert(
                "link",
                "<http://firstdue/dispatches?page=2>; rel=\"next\"".parse().unwrap(),
            );
            (
                StatusCode::OK,
                response_headers,
                Json(json!([
                    { "id": 1, "type": "EMS", "created_at": "2026-03-01T12:00:00Z" },
                    { "id": 2, "type": "Fire", "created_at": "2026-03-01T12:00:05Z" }
                ])),
            )
        }
        _ => (
            StatusCode::OK,
            response_headers,
            Json(json!([
                { "id": "3", "type": "Hazmat", "created_at": "2026-03-01T12:01:00Z" }
            ])),
        ),
    }
}

#[tokio::test]
async fn test_fetch_since_follows_pages_and_authenticates() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/dispatches", get(paged_dispatches))
        .with_state(recorded.clone());
    let base_url = spawn(router).await;

    let client = FirstDueClient::new(&config(base_url)).unwrap();
    let since = Utc.with_ymd_and_hms(2026, 3, 1, 11, 58, 0).unwrap();
    let batch = client.fetch_since(since).await.unwrap();

    assert!(!batch.truncated);
    let ids: Vec<&str> = batch.records.iter().map(|r| r.dispatch_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["since"], "2026-03-01T11:58:00Z");
    assert_eq!(requests[0]["page"], "1");
    assert_eq!(requests[0]["per_page"], "2");
    assert_eq!(requests[1]["page"], "2");
}

#[tokio::test]
async fn test_wrong_key_surfaces_http_status() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/dispatches", get(paged_dispatches))
        .with_state(recorded);
    let base_url = spawn(router).await;

    let mut cfg = config(base_url);
    cfg.api_key = "wrong".to_string();
    let client = FirstDueClient::new(&cfg).unwrap();

    let err = client.fetch_since(Utc::now()).await.unwrap_err();
    assert!(matches!(err, ListenerError::HttpStatus { status: 401, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_object_body_is_malformed_response() {
    let router = Router::new().route(
        "/dispatches",
        get(|| async { Json(json!({ "data": [] })) }),
    );
    let base_url = spawn(router).await;

    let client = FirstDueClient::new(&config(base_url)).unwrap();
    let err = client.fetch_since(Utc::now()).await.unwrap_err();
    assert!(matches!(err, ListenerError::MalformedResponse(_)));
}

/// Endless pagination, one dispatch per page. `step_secs` sets how far each
/// page moves in time: positive is oldest first, negative newest first.
fn endless_pages(step_secs: i64) -> (Router, Arc<Mutex<u32>>) {
    let calls = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&calls);
    let router = Router::new().route(
        "/dispatches",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                let page = {
                    let mut calls = counter.lock().unwrap();
                    *calls += 1;
                    *calls
                };
                let created_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                    + chrono::Duration::seconds(step_secs * i64::from(page));
                let mut headers = HeaderMap::new();
                headers.insert("link", "<next>; rel=\"next\"".parse().unwrap());
                (
                    headers,
                    Json(json!([
                        { "id": page, "type": "EMS", "created_at": created_at.to_rfc3339() }
                    ])),
                )
            }
        }),
    );
    (router, calls)
}

#[tokio::test]
async fn test_page_cap_returns_truncated_batch() {
    let (router, calls) = endless_pages(10);
    let base_url = spawn(router).await;

    let mut cfg = config(base_url);
    cfg.max_pages = 3;
    let client = FirstDueClient::new(&cfg).unwrap();

    let batch = client.fetch_since(Utc::now()).await.unwrap();
    assert!(batch.truncated);
    assert_eq!(batch.len(), 3);
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn test_page_cap_with_newest_first_pages_is_rejected() {
    let (router, calls) = endless_pages(-10);
    let base_url = spawn(router).await;

    let mut cfg = config(base_url);
    cfg.max_pages = 3;
    let client = FirstDueClient::new(&cfg).unwrap();

    let err = client.fetch_since(Utc::now()).await.unwrap_err();
    assert!(matches!(err, ListenerError::MalformedResponse(_)));
    assert!(err.to_string().contains("newest first"));
    assert_eq!(*calls.lock().unwrap(), 3);
}
