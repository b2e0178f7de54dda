//! Tests for router builders

use std::sync::Arc;

use async_inference_gate::builders::{build_router, router_from_env};
use async_inference_gate::config::GateConfig;
use async_inference_gate::core::GateError;
use async_inference_gate::infra::{InMemoryJobRunner, InMemoryLedgerStore, InMemoryNotifier};

#[test]
fn test_build_router_from_default_config() {
    let router = build_router(
        GateConfig::default(),
        Arc::new(InMemoryJobRunner::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryNotifier::new()),
    )
    .unwrap();
    assert_eq!(router.ledger().table(), "async-inf-jobs");
    assert_eq!(router.admission().max_results(), 100);
}

#[test]
fn test_build_router_rejects_invalid_config() {
    let cfg = GateConfig {
        jobs_limit: 0,
        ..GateConfig::default()
    };
    let result = build_router(
        cfg,
        Arc::new(InMemoryJobRunner::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryNotifier::new()),
    );
    assert!(matches!(result, Err(GateError::Config(_))));
}

#[test]
fn test_router_from_env_installs_logging() {
    let router = router_from_env(
        Arc::new(InMemoryJobRunner::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryNotifier::new()),
    )
    .unwrap();
    assert!(tracing::dispatcher::has_been_set());
    assert!(router.config().validate().is_ok());
}
