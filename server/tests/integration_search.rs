use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use quarry_core::analysis::Analyzer;
use quarry_core::models::{now_millis, Document, Posting, SourceType};
use quarry_core::search::{SearchEngine, SearchResponse, SearchResult, Searcher};
use quarry_core::store::{SearchStore, TermUpsert};
use quarry_core::StoreError;
use quarry_server::build_app;

struct StubSearcher {
    fail: bool,
}

#[async_trait]
impl Searcher for StubSearcher {
    async fn search(
        &self,
        query: &str,
        page: i64,
        limit: i64,
    ) -> Result<SearchResponse, StoreError> {
        if self.fail {
            return Err(StoreError::CorruptDocument {
                id: "x".into(),
                detail: "stub failure".into(),
            });
        }
        Ok(SearchResponse {
            data: vec![SearchResult {
                doc_id: "stub".into(),
                title: format!("result for {query}"),
                url: "https://example.com".into(),
                score: 1.0,
            }],
            page,
            limit,
            total: 1,
        })
    }
}

async fn call(app: axum::Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Bytes) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_requires_q_page_and_limit() {
    for uri in [
        "/api/v1/search",
        "/api/v1/search?page=1&limit=10",
        "/api/v1/search?q=rust&limit=10",
        "/api/v1/search?q=rust&page=1",
    ] {
        let app = build_app(Arc::new(StubSearcher { fail: false }));
        let (status, _) = get(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
    }
}

#[tokio::test]
async fn non_integer_pagination_is_rejected() {
    let app = build_app(Arc::new(StubSearcher { fail: false }));
    let (status, body) = get(app, "/api/v1/search?q=rust&page=one&limit=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("page"));

    let app = build_app(Arc::new(StubSearcher { fail: false }));
    let (status, _) = get(app, "/api/v1/search?q=rust&page=1&limit=ten").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn searcher_failure_maps_to_500() {
    let app = build_app(Arc::new(StubSearcher { fail: true }));
    let (status, _) = get(app, "/api/v1/search?q=rust&page=1&limit=10").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn valid_search_returns_envelope() {
    let app = build_app(Arc::new(StubSearcher { fail: false }));
    let (status, body) = get(app, "/api/v1/search?q=rust&page=2&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["page"], 2);
    assert_eq!(json["limit"], 5);
    assert_eq!(json["total"], 1);
    assert_eq!(json["data"][0]["docID"], "stub");
    // score is internal only
    assert!(json["data"][0].get("score").is_none());
}

#[tokio::test]
async fn preflight_options_returns_200() {
    let app = build_app(Arc::new(StubSearcher { fail: false }));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/search")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

async fn seeded_engine() -> (Arc<SearchEngine>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("search.db").display());
    let store = SearchStore::connect(&url).await.unwrap();

    // Two documents mentioning running; the first does so twice.
    let heavy = Document::new(
        SourceType::File,
        "/docs/heavy.txt",
        "Running guide",
        "running runner runs",
        now_millis(),
        Some("/docs/heavy.txt".into()),
    );
    let light = Document::new(
        SourceType::File,
        "/docs/light.txt",
        "Casual jog",
        "a single run mentioned",
        now_millis(),
        Some("/docs/light.txt".into()),
    );
    store
        .bulk_write_documents(std::slice::from_ref(&heavy))
        .await
        .unwrap();
    store
        .bulk_write_documents(std::slice::from_ref(&light))
        .await
        .unwrap();
    store
        .bulk_write_inverted_index(&[
            TermUpsert {
                term: "run".into(),
                posting: Posting {
                    doc_id: heavy.id.clone(),
                    tf: 2,
                    positions: vec![0, 2],
                },
            },
            TermUpsert {
                term: "runner".into(),
                posting: Posting {
                    doc_id: heavy.id.clone(),
                    tf: 1,
                    positions: vec![1],
                },
            },
            TermUpsert {
                term: "run".into(),
                posting: Posting {
                    doc_id: light.id.clone(),
                    tf: 1,
                    positions: vec![2],
                },
            },
        ])
        .await
        .unwrap();
    store.update_index_stats(2).await.unwrap();

    let engine = Arc::new(SearchEngine::new(Arc::new(Analyzer::english()), store));
    (engine, dir)
}

#[tokio::test]
async fn search_ranks_by_tf_idf_descending() {
    let (engine, _dir) = seeded_engine().await;
    let app = build_app(engine);

    let (status, body) = get(app, "/api/v1/search?q=run&page=1&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 2);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["title"], "Running guide");
    assert_eq!(data[1]["title"], "Casual jog");
}

#[tokio::test]
async fn stopword_only_query_returns_nothing() {
    let (engine, _dir) = seeded_engine().await;
    let app = build_app(engine);

    let (status, body) = get(app, "/api/v1/search?q=it+is+a&page=1&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 0);
    // empty data is elided from the payload entirely
    assert!(json.get("data").is_none());
}
