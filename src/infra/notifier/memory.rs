//! In-memory notification sink.

use parking_lot::Mutex;

use crate::core::{CompletionNotification, GateError, Notifier};

/// Sink that keeps every notification, for development/testing.
#[derive(Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<CompletionNotification>>,
}

impl InMemoryNotifier {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    pub fn notifications(&self) -> Vec<CompletionNotification> {
        self.sent.lock().clone()
    }

    /// Number of notifications received for `job_name`.
    pub fn count_for(&self, job_name: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.job_name == job_name)
            .count()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notification: CompletionNotification) -> Result<(), GateError> {
        self.sent.lock().push(notification);
        Ok(())
    }
}
