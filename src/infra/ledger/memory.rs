//! In-memory ledger store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{GateError, LedgerEntry, LedgerStore, WriteOutcome};

/// Ledger store keeping tables in process memory, for development/testing.
///
/// `put_if_absent` is atomic per key under a single mutex.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    tables: Mutex<HashMap<String, HashMap<String, LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    /// Create a store with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store where `table` already exists.
    #[must_use]
    pub fn with_table(table: &str) -> Self {
        let store = Self::new();
        store.tables.lock().insert(table.to_string(), HashMap::new());
        store
    }

    /// True if `table` exists.
    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.lock().contains_key(table)
    }

    /// Number of entries in `table` (zero if absent).
    pub fn len(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, HashMap::len)
    }

    /// True when `table` holds no entries.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Snapshot of the entries of `table`.
    pub fn entries(&self, table: &str) -> Vec<LedgerEntry> {
        self.tables
            .lock()
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn missing(table: &str) -> GateError {
    GateError::NotFound(format!("table {table}"))
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load_table(&self, table: &str) -> Result<(), GateError> {
        if self.table_exists(table) {
            Ok(())
        } else {
            Err(missing(table))
        }
    }

    async fn create_table(&self, table: &str, key_attribute: &str) -> Result<(), GateError> {
        match self.tables.lock().entry(table.to_string()) {
            Entry::Occupied(_) => Err(GateError::Conflict(format!("table {table} already exists"))),
            Entry::Vacant(v) => {
                tracing::debug!(table, key_attribute, "created in-memory ledger table");
                v.insert(HashMap::new());
                Ok(())
            }
        }
    }

    async fn get(&self, table: &str, job_id: &str) -> Result<Option<LedgerEntry>, GateError> {
        let tables = self.tables.lock();
        let rows = tables.get(table).ok_or_else(|| missing(table))?;
        Ok(rows.get(job_id).cloned())
    }

    async fn put_if_absent(
        &self,
        table: &str,
        entry: LedgerEntry,
    ) -> Result<WriteOutcome, GateError> {
        let mut tables = self.tables.lock();
        let rows = tables.get_mut(table).ok_or_else(|| missing(table))?;
        match rows.entry(entry.job_id.clone()) {
            Entry::Occupied(_) => Ok(WriteOutcome::AlreadyExists),
            Entry::Vacant(v) => {
                v.insert(entry);
                Ok(WriteOutcome::Inserted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let store = InMemoryLedgerStore::new();
        assert!(matches!(
            store.load_table("t").await,
            Err(GateError::NotFound(_))
        ));
        assert!(matches!(store.get("t", "job").await, Err(GateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_if_absent_only_once() {
        let store = InMemoryLedgerStore::with_table("t");
        let first = store.put_if_absent("t", LedgerEntry::new("job")).await.unwrap();
        let second = store.put_if_absent("t", LedgerEntry::new("job")).await.unwrap();
        assert_eq!(first, WriteOutcome::Inserted);
        assert_eq!(second, WriteOutcome::AlreadyExists);
        assert_eq!(store.len("t"), 1);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = InMemoryLedgerStore::new();
        store.create_table("t", "job_id").await.unwrap();
        assert!(matches!(
            store.create_table("t", "job_id").await,
            Err(GateError::Conflict(_))
        ));
    }
}
