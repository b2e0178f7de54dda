//! Notification sink that only logs.

use crate::core::{CompletionNotification, GateError, Notifier};

/// Emits each notification as a structured `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: CompletionNotification) -> Result<(), GateError> {
        tracing::info!(
            notification_id = %notification.notification_id,
            job_name = %notification.job_name,
            output = %notification.output_location,
            "job completed"
        );
        Ok(())
    }
}
