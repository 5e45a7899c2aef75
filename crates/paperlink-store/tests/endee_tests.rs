use httpmock::prelude::*;
use serde_json::json;

use paperlink_core::types::Metadata;
use paperlink_store::{EndeeClient, StoreError, VectorRecord, VectorStore};

fn client_for(server: &MockServer) -> EndeeClient {
    EndeeClient::new(server.base_url(), "test_collection").expect("client")
}

fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
    let mut metadata = Metadata::new();
    metadata.insert("paper_id".to_string(), json!("paper_1"));
    VectorRecord {
        id: id.to_string(),
        vector,
        metadata,
    }
}

#[tokio::test]
async fn health_check_reports_liveness() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/health");
            then.status(200);
        })
        .await;

    let client = client_for(&server);
    assert!(client.health_check().await);
    mock.assert_async().await;
}

#[tokio::test]
async fn health_check_false_when_unreachable() {
    // Nothing listens on this port.
    let client = EndeeClient::new("http://127.0.0.1:1", "test_collection").expect("client");
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn upsert_splits_into_batches_of_100() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v1/points")
                .body_contains("\"index\":\"test_collection\"");
            then.status(200);
        })
        .await;

    let records: Vec<VectorRecord> = (0..250)
        .map(|i| record(&format!("id_{i}"), vec![0.1, 0.2]))
        .collect();

    let client = client_for(&server);
    client.upsert(&records).await.expect("upsert");

    assert_eq!(mock.hits_async().await, 3, "250 records -> 3 batches");
}

#[tokio::test]
async fn upsert_empty_input_makes_no_requests() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/v1/points");
            then.status(200);
        })
        .await;

    let client = client_for(&server);
    client.upsert(&[]).await.expect("upsert");
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn upsert_mid_stream_failure_reports_partial_write() {
    let server = MockServer::start_async().await;
    // First batch (contains id_0) succeeds, second batch (contains id_100)
    // fails; the third batch must never be sent.
    let ok_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v1/points")
                .body_contains("\"id_0\"");
            then.status(200);
        })
        .await;
    let fail_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v1/points")
                .body_contains("\"id_100\"");
            then.status(500).body("disk full");
        })
        .await;

    let records: Vec<VectorRecord> = (0..250)
        .map(|i| record(&format!("id_{i}"), vec![0.1, 0.2]))
        .collect();

    let client = client_for(&server);
    let err = client.upsert(&records).await.expect_err("must fail");

    match err {
        StoreError::PartialWrite { written, remaining, .. } => {
            assert_eq!(written, 100);
            assert_eq!(remaining, 150);
        }
        other => panic!("expected PartialWrite, got {other:?}"),
    }
    assert_eq!(ok_mock.hits_async().await, 1);
    assert_eq!(fail_mock.hits_async().await, 1);
}

#[tokio::test]
async fn upsert_first_batch_failure_is_plain_status_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/v1/points");
            then.status(503).body("unavailable");
        })
        .await;

    let client = client_for(&server);
    let err = client
        .upsert(&[record("id_0", vec![0.1])])
        .await
        .expect_err("must fail");

    match err {
        StoreError::Status { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn search_parses_hits_in_store_order() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/search")
                .body_contains("\"k\":2");
            then.status(200).json_body(json!({
                "results": [
                    {"id": "a_chunk_0", "score": 0.92, "metadata": {"paper_id": "a"}},
                    {"id": "b_chunk_3", "score": 0.71, "metadata": {"paper_id": "b"}}
                ]
            }));
        })
        .await;

    let client = client_for(&server);
    let hits = client.search(&[0.5, 0.5], 2, None).await.expect("search");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "a_chunk_0");
    assert!((hits[0].score - 0.92).abs() < 1e-6);
    assert_eq!(hits[1].id, "b_chunk_3");
}

#[tokio::test]
async fn search_sends_metadata_filter() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/search")
                .body_contains("\"filter\"")
                .body_contains("\"source\":\"arxiv\"");
            then.status(200).json_body(json!({"results": []}));
        })
        .await;

    let mut filter = Metadata::new();
    filter.insert("source".to_string(), json!("arxiv"));

    let client = client_for(&server);
    let hits = client
        .search(&[0.5, 0.5], 5, Some(&filter))
        .await
        .expect("search");

    assert!(hits.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn search_error_is_distinguishable_from_no_matches() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/search");
            then.status(500).body("boom");
        })
        .await;

    let client = client_for(&server);
    let result = client.search(&[0.5], 5, None).await;
    assert!(
        matches!(result, Err(StoreError::Status { status: 500, .. })),
        "a store failure must not look like an empty result set"
    );
}

#[tokio::test]
async fn fetch_point_roundtrip_and_absent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/points/paper_1_chunk_0")
                .query_param("index", "test_collection");
            then.status(200).json_body(json!({
                "id": "paper_1_chunk_0",
                "vector": [0.1, 0.2, 0.3],
                "metadata": {"paper_id": "paper_1"}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/points/paper_42_chunk_0");
            then.status(404);
        })
        .await;

    let client = client_for(&server);

    let found = client
        .fetch_point("paper_1_chunk_0")
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(found.vector, vec![0.1, 0.2, 0.3]);

    let absent = client.fetch_point("paper_42_chunk_0").await.expect("fetch");
    assert!(absent.is_none());
}

#[tokio::test]
async fn delete_collection_is_idempotent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v1/index/test_collection");
            then.status(404);
        })
        .await;

    let client = client_for(&server);
    client.delete_collection().await.expect("already absent is success");
    mock.assert_async().await;
}

#[tokio::test]
async fn delete_collection_surfaces_server_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v1/index/test_collection");
            then.status(500);
        })
        .await;

    let client = client_for(&server);
    assert!(client.delete_collection().await.is_err());
}

#[tokio::test]
async fn ensure_collection_is_idempotent_and_validates() {
    let server = MockServer::start_async().await;
    let client = client_for(&server);

    client.ensure_collection(384, "cosine").await.expect("first");
    client.ensure_collection(384, "cosine").await.expect("second");

    let err = client.ensure_collection(0, "cosine").await;
    assert!(matches!(err, Err(StoreError::Config(_))));
}
