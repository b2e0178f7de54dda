//! Infrastructure adapters for the runner, ledger store and notification sink.

pub mod ledger;
pub mod notifier;
pub mod runner;
pub use ledger::{FileLedgerStore, InMemoryLedgerStore};
pub use notifier::{InMemoryNotifier, TracingNotifier};
pub use runner::InMemoryJobRunner;
