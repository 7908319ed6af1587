//! Pagination behaviour against a mock API
//!
//! Covers multi-page merging, token cycles, continuation failures and
//! single-page passthrough.

mod common;

use common::{api_config, envelope, init_test_tracing, readings_page};
use serde_json::json;
use sgw_ingest::api::IngestionSession;
use sgw_ingest::config::ApiConfig;
use sgw_ingest::IngestError;
use wiremock::{
    matchers::{method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

const RAINFALL: &str = "/rainfall";

fn date_query() -> Vec<(String, String)> {
    vec![("date".to_string(), "2024-12-01".to_string())]
}

async fn mount_first_page(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(RAINFALL))
        .and(query_param("date", "2024-12-01"))
        .and(query_param_is_missing("paginationToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(body)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, token: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(RAINFALL))
        .and(query_param("date", "2024-12-01"))
        .and(query_param("paginationToken", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(body)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_merges_all_pages() {
    init_test_tracing();
    let server = MockServer::start().await;

    mount_first_page(&server, readings_page(0, 3, Some("A"))).await;
    mount_page(&server, "A", readings_page(3, 4, Some("B"))).await;
    mount_page(&server, "B", readings_page(7, 2, None)).await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let merged = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap();

    let readings = merged["readings"].as_array().unwrap();
    assert_eq!(readings.len(), 3 + 4 + 2);
    assert_eq!(readings[0]["timestamp"], "2024-12-01T00:00:00+08:00");
    assert_eq!(merged["readingUnit"], "mm");
    assert!(merged.get("paginationToken").is_none());
}

#[tokio::test]
async fn test_token_cycle_stops_after_repeating_page() {
    init_test_tracing();
    let server = MockServer::start().await;

    // Tokens A, B, A: the third page repeats A
    mount_first_page(&server, readings_page(0, 1, Some("A"))).await;
    mount_page(&server, "A", readings_page(1, 1, Some("B"))).await;
    mount_page(&server, "B", readings_page(2, 1, Some("A"))).await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let merged = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap();

    assert_eq!(merged["readings"].as_array().unwrap().len(), 3);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_continuation_failure_returns_partial_result() {
    init_test_tracing();
    let server = MockServer::start().await;

    mount_first_page(&server, readings_page(0, 2, Some("A"))).await;
    mount_page(&server, "A", readings_page(2, 3, Some("B"))).await;
    Mock::given(method("GET"))
        .and(path(RAINFALL))
        .and(query_param("paginationToken", "B"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let merged = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap();

    assert_eq!(merged["readings"].as_array().unwrap().len(), 5);
    assert!(merged.get("paginationToken").is_none());
}

#[tokio::test]
async fn test_continuation_retry_recovers() {
    init_test_tracing();
    let server = MockServer::start().await;

    mount_first_page(&server, readings_page(0, 1, Some("A"))).await;
    // First attempt at page two fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path(RAINFALL))
        .and(query_param("paginationToken", "A"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "A", readings_page(1, 2, None)).await;

    let config = ApiConfig {
        page_retries: 2,
        ..api_config(&server.uri())
    };
    let session = IngestionSession::open(config).unwrap();
    let merged = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap();

    assert_eq!(merged["readings"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_first_page_failure_is_an_error() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RAINFALL))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let err = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap_err();

    assert!(matches!(err, IngestError::Transport { .. }));
}

#[tokio::test]
async fn test_api_error_code_on_first_page() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RAINFALL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 17,
            "errorMsg": "Invalid date",
            "data": null
        })))
        .mount(&server)
        .await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let err = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap_err();

    match err {
        IngestError::Api { code, message, .. } => {
            assert_eq!(code, 17);
            assert_eq!(message, "Invalid date");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_response_without_collection_is_single_page() {
    init_test_tracing();
    let server = MockServer::start().await;

    let body = json!({"stations": [], "paginationToken": "A"});
    mount_first_page(&server, body.clone()).await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let returned = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap();

    assert_eq!(returned, body);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_inconsistent_continuation_page_stops() {
    init_test_tracing();
    let server = MockServer::start().await;

    mount_first_page(&server, readings_page(0, 2, Some("A"))).await;
    mount_page(&server, "A", json!({"stations": [], "paginationToken": "B"})).await;

    let session = IngestionSession::open(api_config(&server.uri())).unwrap();
    let merged = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap();

    assert_eq!(merged["readings"].as_array().unwrap().len(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_closed_session_refuses_to_fetch() {
    let server = MockServer::start().await;

    let mut session = IngestionSession::open(api_config(&server.uri())).unwrap();
    session.close();
    let err = session.fetcher().fetch(RAINFALL, &date_query()).await.unwrap_err();

    assert!(matches!(err, IngestError::NotConnected));
    assert!(server.received_requests().await.unwrap().is_empty());
}
