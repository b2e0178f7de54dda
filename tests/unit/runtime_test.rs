//! Tests for runtime entry points

use std::sync::Arc;

use async_inference_gate::builders::build_router;
use async_inference_gate::config::GateConfig;
use async_inference_gate::infra::{InMemoryJobRunner, InMemoryLedgerStore, InMemoryNotifier};
use async_inference_gate::runtime::{handle_raw_event, health};

#[test]
fn test_health() {
    assert!(health().ok);
}

#[tokio::test]
async fn test_raw_event_round_trip() {
    let router = build_router(
        GateConfig::default(),
        Arc::new(InMemoryJobRunner::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryNotifier::new()),
    )
    .unwrap();

    let resp = handle_raw_event(&router, r#"{"body": "{\"type\": \"kwm-model-a\"}"}"#).await;
    assert_eq!(resp.status_code, 200);
    assert_eq!(
        resp.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    let body = resp.decoded_body().unwrap();
    assert_eq!(body.status, 200);
    assert!(body.err_msg.contains("kwm-model-a-job-"));
}

#[tokio::test]
async fn test_raw_event_not_json() {
    let router = build_router(
        GateConfig::default(),
        Arc::new(InMemoryJobRunner::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryNotifier::new()),
    )
    .unwrap();

    let resp = handle_raw_event(&router, "{{{").await;
    assert_eq!(resp.status_code, 400);
}
