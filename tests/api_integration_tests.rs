//! Integration tests for the node HTTP surface.
//!
//! Drives the full router for a single-node cluster: the node owns every key,
//! so each request is served from the local store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use distributed_cache::cache::KvStore;
use distributed_cache::ring::HashRing;
use distributed_cache::routing::{create_router, CacheNode};
use distributed_cache::telemetry::Metrics;

fn single_node_app() -> Router {
    let ring = Arc::new(HashRing::new(128));
    ring.add("n1", "n1:8080");
    let node = Arc::new(CacheNode::new(
        "n1".to_string(),
        "n1:8080".to_string(),
        Arc::new(KvStore::new(64 * 1024)),
        ring,
        2,
        reqwest::Client::new(),
    ));
    create_router(node, Arc::new(Metrics::new()))
}

fn empty_ring_app() -> Router {
    let node = Arc::new(CacheNode::new(
        "n1".to_string(),
        "n1:8080".to_string(),
        Arc::new(KvStore::new(64 * 1024)),
        Arc::new(HashRing::new(128)),
        2,
        reqwest::Client::new(),
    ));
    create_router(node, Arc::new(Metrics::new()))
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_put_get_delete_roundtrip() {
    let app = single_node_app();

    let put = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/kv/foo")
                .body(Body::from("bar"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::NO_CONTENT);

    let get = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/kv/foo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(
        get.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(get.into_body()).await, b"bar");

    let del = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/kv/foo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(del.status(), StatusCode::NO_CONTENT);

    let get_again = app
        .oneshot(
            Request::builder()
                .uri("/kv/foo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get_again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_writes_like_put() {
    let app = single_node_app();

    let post = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/kv/posted")
                .body(Body::from("payload"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(post.status(), StatusCode::NO_CONTENT);

    let get = app
        .oneshot(
            Request::builder()
                .uri("/kv/posted")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_bytes(get.into_body()).await, b"payload");
}

#[tokio::test]
async fn test_ttl_expires_key() {
    let app = single_node_app();

    let put = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/kv/eph?ttl=1")
                .body(Body::from("short-lived"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::NO_CONTENT);

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let get = app
        .oneshot(
            Request::builder()
                .uri("/kv/eph")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_ttl_is_rejected() {
    let app = single_node_app();

    let put = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/kv/foo?ttl=soon")
                .body(Body::from("bar"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let app = single_node_app();

    let patch = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/kv/foo")
                .body(Body::from("x"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(patch.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_empty_ring_yields_503() {
    let app = empty_ring_app();

    let put = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/kv/foo")
                .body(Body::from("bar"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::SERVICE_UNAVAILABLE);

    let get = app
        .oneshot(
            Request::builder()
                .uri("/kv/foo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_healthz() {
    let app = single_node_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"ok");
}

#[tokio::test]
async fn test_info_reports_item_count() {
    let app = single_node_app();

    app.clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/kv/one")
                .body(Body::from("1"))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response.into_body()).await).unwrap();
    assert!(json["pid"].as_u64().unwrap() > 0);
    assert_eq!(json["items"].as_u64().unwrap(), 1);
    // RFC 3339 timestamps carry a date-time separator.
    assert!(json["now"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = single_node_app();

    // Generate one successful GET-path request first.
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(text.contains("requests_total{op=\"get\",class=\"2xx\"} 1"));
    assert!(text.contains("# TYPE request_duration_seconds histogram"));
    assert!(text.contains("in_flight_requests{op=\"get\"}"));
    assert!(text.contains("uptime_seconds"));
    assert!(text.contains("build_info{version="));
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = single_node_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response.into_body()).await).unwrap();
    assert_eq!(json["node_id"].as_str().unwrap(), "n1");
    assert_eq!(json["peers"].as_u64().unwrap(), 1);
    assert_eq!(json["replication_factor"].as_u64().unwrap(), 2);
}
