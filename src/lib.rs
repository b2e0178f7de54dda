//! # Async Inference Gate
//!
//! Admission control and exactly-once completion notification for
//! asynchronous inference jobs running on an external compute-job runner.
//!
//! Two kinds of events reach the gate:
//!
//! - **New requests** name a job category. The category must be in the
//!   allow-list; the runner's in-flight jobs of that category are counted
//!   against a concurrency limit; if a slot is free the job is submitted
//!   without waiting for it to finish.
//! - **Completion notifications** arrive from the runner at least once per
//!   job, in any order. The first `Completed` delivery for a job records it in
//!   a durable ledger and fires a downstream notification. Later deliveries,
//!   and concurrent duplicates, are suppressed by a conditional insert.
//!
//! ## Components
//!
//! - `AdmissionController`: in-flight count vs. limit
//! - `JobDispatcher`: allow-list check and fire-and-forget submission
//! - `CompletionLedger`: lazily created idempotency table
//! - `EventRouter`: classifies an event once and composes the others
//!
//! Collaborators (`JobRunner`, `LedgerStore`, `Notifier`) are traits; the
//! `infra` module ships in-memory and file-backed implementations.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use async_inference_gate::builders::router_from_env;
//! use async_inference_gate::infra::{FileLedgerStore, InMemoryJobRunner, TracingNotifier};
//! use async_inference_gate::runtime::handle_raw_event;
//!
//! let router = router_from_env(
//!     Arc::new(InMemoryJobRunner::new()),
//!     Arc::new(FileLedgerStore::new("/var/lib/gate")?),
//!     Arc::new(TracingNotifier),
//! )?;
//! let resp = handle_raw_event(&router, r#"{"body": "{\"type\": \"kwm-model-a\"}"}"#).await;
//! assert_eq!(resp.status_code, 200);
//! ```
//!
//! For complete scenarios, see `tests/router_scenarios_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission, dispatch and completion-dedup logic.
pub mod core;
/// Configuration models and per-request overrides.
pub mod config;
/// Builders to construct the router from configuration.
pub mod builders;
/// Infrastructure adapters for runners, ledger stores and notification sinks.
pub mod infra;
/// Entry points and the response envelope.
pub mod runtime;
/// Shared utilities.
pub mod util;
