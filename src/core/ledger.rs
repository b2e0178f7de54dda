//! Durable idempotency ledger for completion notifications.
//!
//! One entry per job name, created the first time a `Completed` event is
//! processed. The entry's existence is the only fact tracked. Writes go
//! through [`LedgerStore::put_if_absent`], so two concurrent deliveries of the
//! same completion event can never both observe [`WriteOutcome::Inserted`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::GateError;
use crate::util::clock::now_ms;

/// Name of the single hash key of the ledger table.
pub const LEDGER_KEY_ATTRIBUTE: &str = "job_id";

/// Row stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Primary key: job name.
    pub job_id: String,
    /// Timestamp milliseconds.
    pub recorded_at_ms: u128,
}

impl LedgerEntry {
    /// Entry for a job, stamped now.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            recorded_at_ms: now_ms(),
        }
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The key was absent and the entry is now stored.
    Inserted,
    /// The key already existed; nothing was written.
    AlreadyExists,
}

/// Persistent key-value store backing the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Check that `table` exists. Returns [`GateError::NotFound`] when it
    /// does not; any other error is a real backend failure.
    async fn load_table(&self, table: &str) -> Result<(), GateError>;

    /// Create `table` keyed on `key_attribute` and wait until it is usable.
    /// May return [`GateError::Conflict`] if another caller created it first.
    async fn create_table(&self, table: &str, key_attribute: &str) -> Result<(), GateError>;

    /// Point lookup by primary key.
    async fn get(&self, table: &str, job_id: &str) -> Result<Option<LedgerEntry>, GateError>;

    /// Insert `entry` only if its key is absent. Must be atomic per key.
    async fn put_if_absent(&self, table: &str, entry: LedgerEntry)
        -> Result<WriteOutcome, GateError>;
}

/// Idempotency store keyed by job name.
pub struct CompletionLedger<L> {
    store: Arc<L>,
    table: String,
    schema_ready: AtomicBool,
}

impl<L: LedgerStore> CompletionLedger<L> {
    /// Wrap a store handle; the table is created lazily by
    /// [`ensure_schema`](Self::ensure_schema).
    pub fn new(store: Arc<L>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            schema_ready: AtomicBool::new(false),
        }
    }

    /// Ledger table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Underlying store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<L> {
        &self.store
    }

    /// Make sure the ledger table exists, creating it if absent.
    ///
    /// Safe to call on every event: after the first success only an atomic
    /// flag is read.
    ///
    /// # Errors
    ///
    /// Propagates any store failure other than "table not found".
    pub async fn ensure_schema(&self) -> Result<(), GateError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        match self.store.load_table(&self.table).await {
            Ok(()) => {}
            Err(GateError::NotFound(_)) => {
                tracing::info!(table = %self.table, "ledger table missing, creating");
                match self
                    .store
                    .create_table(&self.table, LEDGER_KEY_ATTRIBUTE)
                    .await
                {
                    Ok(()) => {}
                    Err(GateError::Conflict(reason)) => {
                        tracing::debug!(table = %self.table, %reason, "ledger table created concurrently");
                    }
                    Err(e) => {
                        tracing::error!(table = %self.table, error = %e, "couldn't create ledger table");
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                tracing::error!(table = %self.table, error = %e, "couldn't check for ledger table");
                return Err(e);
            }
        }

        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// True when a completion for `job_name` was already recorded.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn has_recorded(&self, job_name: &str) -> Result<bool, GateError> {
        let entry = self.store.get(&self.table, job_name).await.map_err(|e| {
            tracing::error!(job_name, table = %self.table, error = %e, "couldn't get ledger entry");
            e
        })?;
        Ok(entry.is_some())
    }

    /// Record a completion. Only the caller that sees
    /// [`WriteOutcome::Inserted`] may fire the notification.
    ///
    /// # Errors
    ///
    /// Propagates store failures. A duplicate key is not an error.
    pub async fn record(&self, job_name: &str) -> Result<WriteOutcome, GateError> {
        let outcome = self
            .store
            .put_if_absent(&self.table, LedgerEntry::new(job_name))
            .await
            .map_err(|e| {
                tracing::error!(job_name, table = %self.table, error = %e, "couldn't add ledger entry");
                e
            })?;
        if outcome == WriteOutcome::AlreadyExists {
            tracing::debug!(job_name, "ledger entry already present");
        }
        Ok(outcome)
    }
}
