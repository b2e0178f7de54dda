//! File-backed ledger store using JSON lines for durability.
//!
//! Each table is one `{table}_ledger.jsonl` file under the store directory.
//! The first line is a schema header naming the key attribute; every further
//! line is one [`LedgerEntry`]. Entries survive process restarts.
//!
//! Nothing is cached between calls. Lookups re-read the file under a shared
//! `flock`; inserts re-read and append under an exclusive one, so any number
//! of stores (in one process or many) sharing a directory agree on which
//! caller inserted a key first. A trailing line that does not parse is a torn
//! append: readers skip it and the next insert truncates it away. An
//! unparsable line anywhere else is a backend error.
//!
//! File I/O, including the `sync_data` after each append, runs on tokio's
//! blocking pool so lock waits never stall the async workers.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::core::{GateError, LedgerEntry, LedgerStore, WriteOutcome};

#[derive(Debug, Serialize, Deserialize)]
struct SchemaHeader {
    key_attribute: String,
}

type Rows = std::collections::HashMap<String, LedgerEntry>;

/// Rows read from a table file.
struct Snapshot {
    rows: Rows,
    /// Bytes up to the end of the last readable line.
    valid_len: u64,
    /// The readable prefix does not end with a newline.
    unterminated: bool,
}

/// Durable ledger store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

fn io_err(e: &std::io::Error) -> GateError {
    GateError::Backend(e.to_string())
}

fn parse_rows(bytes: &[u8], origin: &Path) -> Result<Snapshot, GateError> {
    let mut rows = Rows::new();
    let mut offset = 0usize;
    let mut lines = bytes.split_inclusive(|b| *b == b'\n').enumerate().peekable();

    while let Some((idx, raw)) = lines.next() {
        let start = offset;
        offset += raw.len();
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if idx == 0 || text.is_empty() {
            continue;
        }
        match serde_json::from_str::<LedgerEntry>(text) {
            Ok(entry) => {
                rows.entry(entry.job_id.clone()).or_insert(entry);
            }
            Err(e) if lines.peek().is_none() => {
                tracing::warn!(
                    path = %origin.display(),
                    offset = start,
                    error = %e,
                    "skipping torn ledger tail"
                );
                return Ok(Snapshot {
                    rows,
                    valid_len: start as u64,
                    unterminated: false,
                });
            }
            Err(e) => {
                return Err(GateError::Backend(format!(
                    "{}: line {}: {e}",
                    origin.display(),
                    idx + 1
                )));
            }
        }
    }

    Ok(Snapshot {
        rows,
        valid_len: offset as u64,
        unterminated: bytes.last().is_some_and(|b| *b != b'\n'),
    })
}

fn open_table(file_path: &Path, table: &str, write: bool) -> Result<File, GateError> {
    match OpenOptions::new().read(true).write(write).open(file_path) {
        Ok(f) => Ok(f),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(GateError::NotFound(format!("table {table}")))
        }
        Err(e) => Err(io_err(&e)),
    }
}

fn read_snapshot(file: &mut File, file_path: &Path) -> Result<Snapshot, GateError> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0)).map_err(|e| io_err(&e))?;
    file.read_to_end(&mut bytes).map_err(|e| io_err(&e))?;
    parse_rows(&bytes, file_path)
}

fn locked_snapshot(file_path: &Path, table: &str) -> Result<Snapshot, GateError> {
    let mut file = open_table(file_path, table, false)?;
    FileExt::lock_shared(&file).map_err(|e| io_err(&e))?;
    read_snapshot(&mut file, file_path)
}

fn insert_locked(
    file_path: &Path,
    table: &str,
    entry: &LedgerEntry,
) -> Result<WriteOutcome, GateError> {
    let mut file = open_table(file_path, table, true)?;
    FileExt::lock_exclusive(&file).map_err(|e| io_err(&e))?;

    let snapshot = read_snapshot(&mut file, file_path)?;
    if snapshot.rows.contains_key(&entry.job_id) {
        return Ok(WriteOutcome::AlreadyExists);
    }

    let len = file.metadata().map_err(|e| io_err(&e))?.len();
    if len > snapshot.valid_len {
        tracing::warn!(
            path = %file_path.display(),
            dropped = len - snapshot.valid_len,
            "truncating torn ledger tail"
        );
        file.set_len(snapshot.valid_len).map_err(|e| io_err(&e))?;
    }

    let mut line = String::new();
    if snapshot.unterminated {
        line.push('\n');
    }
    line.push_str(&serde_json::to_string(entry).map_err(|e| GateError::Backend(e.to_string()))?);
    line.push('\n');

    file.seek(SeekFrom::Start(snapshot.valid_len)).map_err(|e| io_err(&e))?;
    file.write_all(line.as_bytes()).map_err(|e| io_err(&e))?;
    file.sync_data().map_err(|e| io_err(&e))?;
    Ok(WriteOutcome::Inserted)
}

async fn blocking<T, F>(f: F) -> Result<T, GateError>
where
    F: FnOnce() -> Result<T, GateError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GateError::Backend(format!("ledger task failed: {e}")))?
}

impl FileLedgerStore {
    /// Open (creating if needed) a store directory.
    ///
    /// # Errors
    ///
    /// [`GateError::Backend`] if the directory cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = path.as_ref().to_path_buf();
        create_dir_all(&path).map_err(|e| io_err(&e))?;
        Ok(Self { path })
    }

    /// Path of the file backing `table`.
    #[must_use]
    pub fn file_path(&self, table: &str) -> PathBuf {
        self.path.join(format!("{table}_ledger.jsonl"))
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn load_table(&self, table: &str) -> Result<(), GateError> {
        let file_path = self.file_path(table);
        let table = table.to_string();
        blocking(move || locked_snapshot(&file_path, &table).map(|_| ())).await
    }

    async fn create_table(&self, table: &str, key_attribute: &str) -> Result<(), GateError> {
        let file_path = self.file_path(table);
        let header = serde_json::to_string(&SchemaHeader {
            key_attribute: key_attribute.to_string(),
        })
        .map_err(|e| GateError::Backend(e.to_string()))?;
        let name = table.to_string();

        blocking(move || {
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&file_path)
            {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    return Err(GateError::Conflict(format!("table {name} already exists")));
                }
                Err(e) => return Err(io_err(&e)),
            };
            FileExt::lock_exclusive(&file).map_err(|e| io_err(&e))?;
            file.write_all(format!("{header}\n").as_bytes())
                .map_err(|e| io_err(&e))?;
            file.sync_all().map_err(|e| io_err(&e))
        })
        .await?;

        tracing::info!(table, path = %self.path.display(), "created ledger table");
        Ok(())
    }

    async fn get(&self, table: &str, job_id: &str) -> Result<Option<LedgerEntry>, GateError> {
        let file_path = self.file_path(table);
        let table = table.to_string();
        let job_id = job_id.to_string();
        blocking(move || {
            let mut snapshot = locked_snapshot(&file_path, &table)?;
            Ok(snapshot.rows.remove(&job_id))
        })
        .await
    }

    async fn put_if_absent(
        &self,
        table: &str,
        entry: LedgerEntry,
    ) -> Result<WriteOutcome, GateError> {
        let file_path = self.file_path(table);
        let table = table.to_string();
        blocking(move || insert_locked(&file_path, &table, &entry)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gate-ledger-{name}-{}", uuid::Uuid::new_v4()));
        create_dir_all(&dir).unwrap();
        dir
    }

    fn job_lines(store: &FileLedgerStore, table: &str, job_id: &str) -> usize {
        let needle = format!("\"job_id\":\"{job_id}\"");
        std::fs::read_to_string(store.file_path(table))
            .unwrap()
            .lines()
            .filter(|l| l.contains(&needle))
            .count()
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = temp_dir("reopen");
        {
            let store = FileLedgerStore::new(&dir).unwrap();
            assert!(matches!(store.load_table("jobs").await, Err(GateError::NotFound(_))));
            store.create_table("jobs", "job_id").await.unwrap();
            let outcome = store.put_if_absent("jobs", LedgerEntry::new("a")).await.unwrap();
            assert_eq!(outcome, WriteOutcome::Inserted);
        }

        let reopened = FileLedgerStore::new(&dir).unwrap();
        reopened.load_table("jobs").await.unwrap();
        assert!(reopened.get("jobs", "a").await.unwrap().is_some());
        let again = reopened.put_if_absent("jobs", LedgerEntry::new("a")).await.unwrap();
        assert_eq!(again, WriteOutcome::AlreadyExists);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_create_existing_conflicts() {
        let dir = temp_dir("conflict");
        let store = FileLedgerStore::new(&dir).unwrap();
        store.create_table("jobs", "job_id").await.unwrap();
        let other = FileLedgerStore::new(&dir).unwrap();
        assert!(matches!(
            other.create_table("jobs", "job_id").await,
            Err(GateError::Conflict(_))
        ));
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_stores_sharing_a_directory_see_each_others_inserts() {
        let dir = temp_dir("shared");
        let first = FileLedgerStore::new(&dir).unwrap();
        let second = FileLedgerStore::new(&dir).unwrap();
        first.create_table("jobs", "job_id").await.unwrap();

        // Both stores have read the table before either inserts.
        assert!(first.get("jobs", "x").await.unwrap().is_none());
        assert!(second.get("jobs", "x").await.unwrap().is_none());

        let a = first.put_if_absent("jobs", LedgerEntry::new("x")).await.unwrap();
        let b = second.put_if_absent("jobs", LedgerEntry::new("x")).await.unwrap();
        assert_eq!(a, WriteOutcome::Inserted);
        assert_eq!(b, WriteOutcome::AlreadyExists);
        assert!(second.get("jobs", "x").await.unwrap().is_some());
        assert_eq!(job_lines(&first, "jobs", "x"), 1);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_across_stores_admit_one() {
        let dir = temp_dir("race");
        FileLedgerStore::new(&dir)
            .unwrap()
            .create_table("jobs", "job_id")
            .await
            .unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = FileLedgerStore::new(&dir).unwrap();
                tokio::spawn(async move { store.put_if_absent("jobs", LedgerEntry::new("x")).await })
            })
            .collect();

        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() == WriteOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(job_lines(&FileLedgerStore::new(&dir).unwrap(), "jobs", "x"), 1);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_torn_tail_is_skipped_then_truncated() {
        let dir = temp_dir("torn");
        let store = FileLedgerStore::new(&dir).unwrap();
        store.create_table("jobs", "job_id").await.unwrap();
        store.put_if_absent("jobs", LedgerEntry::new("a")).await.unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.file_path("jobs"))
            .unwrap();
        file.write_all(br#"{"job_id":"b","reco"#).unwrap();
        drop(file);

        store.load_table("jobs").await.unwrap();
        assert!(store.get("jobs", "a").await.unwrap().is_some());
        assert!(store.get("jobs", "b").await.unwrap().is_none());

        let outcome = store.put_if_absent("jobs", LedgerEntry::new("c")).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Inserted);

        let content = std::fs::read_to_string(store.file_path("jobs")).unwrap();
        assert!(!content.contains("reco"));
        assert_eq!(content.lines().count(), 3);
        assert!(store.get("jobs", "c").await.unwrap().is_some());
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_corrupt_line_mid_file_is_fatal() {
        let dir = temp_dir("corrupt");
        let store = FileLedgerStore::new(&dir).unwrap();
        store.create_table("jobs", "job_id").await.unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.file_path("jobs"))
            .unwrap();
        file.write_all(b"not json\n{\"job_id\":\"a\",\"recorded_at_ms\":1}\n")
            .unwrap();
        drop(file);

        assert!(matches!(store.get("jobs", "a").await, Err(GateError::Backend(_))));
        assert!(matches!(
            store.put_if_absent("jobs", LedgerEntry::new("b")).await,
            Err(GateError::Backend(_))
        ));
        std::fs::remove_dir_all(dir).ok();
    }
}
