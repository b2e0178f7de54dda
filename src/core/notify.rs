//! Downstream notification sink.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GateError;

/// Notification fired once per successfully completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotification {
    /// Notification identifier.
    pub notification_id: Uuid,
    /// Job that completed.
    pub job_name: String,
    /// Where the job wrote its output.
    pub output_location: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl CompletionNotification {
    /// Build a notification for a job.
    pub fn new(job_name: impl Into<String>, output_location: impl Into<String>) -> Self {
        Self {
            notification_id: Uuid::new_v4(),
            job_name: job_name.into(),
            output_location: output_location.into(),
            created_at_ms: crate::util::clock::now_ms(),
        }
    }
}

/// Fire-and-forget notification channel.
pub trait Notifier: Send + Sync + 'static {
    /// Hand a notification to the channel. Delivery is not awaited.
    fn notify(&self, notification: CompletionNotification) -> Result<(), GateError>;
}
