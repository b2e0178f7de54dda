//! Admission control against the runner's in-flight job count.
//!
//! `check_capacity` followed by a submission is not atomic across processes.
//! Two requests evaluated concurrently may both see a free slot and exceed
//! the limit by up to (concurrency - 1) jobs. Within one process the race can
//! be closed by enabling serialized admission, which holds an async mutex
//! across the check and the submission.
//!
//! The in-flight listing is capped at `max_results` rows, so counts above the
//! cap undercount and over-admit under extreme load.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::{GateError, JobRunner};

/// Remaining capacity for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// `limit - in_flight`; may be zero or negative.
    pub available: i64,
    /// Limit that was applied.
    pub limit: u32,
}

impl AdmissionDecision {
    /// Derive a decision from a limit and an observed in-flight count.
    #[must_use]
    pub fn from_counts(limit: u32, in_flight: usize) -> Self {
        let in_flight = i64::try_from(in_flight).unwrap_or(i64::MAX);
        Self {
            available: i64::from(limit) - in_flight,
            limit,
        }
    }

    /// Admission is granted iff at least one slot is free.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        self.available > 0
    }

    /// Slots left once the admitted job is counted.
    #[must_use]
    pub const fn remaining_after_submit(&self) -> i64 {
        if self.available > 1 {
            self.available - 1
        } else {
            0
        }
    }
}

/// Read-only capacity check against the job runner.
pub struct AdmissionController<R> {
    runner: Arc<R>,
    max_results: usize,
    serial: Option<Mutex<()>>,
}

impl<R: JobRunner> AdmissionController<R> {
    /// Create a controller that lists at most `max_results` in-flight jobs.
    pub fn new(runner: Arc<R>, max_results: usize) -> Self {
        Self {
            runner,
            max_results,
            serial: None,
        }
    }

    /// Serialize check-then-submit sequences issued through this controller.
    #[must_use]
    pub fn with_serialized_admission(mut self, enabled: bool) -> Self {
        self.serial = enabled.then(|| Mutex::new(()));
        self
    }

    /// Cap applied to the in-flight listing.
    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Acquire the admission guard when serialization is enabled. Hold the
    /// guard until the submission has been accepted by the runner.
    pub async fn admission_guard(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.serial {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    /// Count in-flight jobs whose name contains `category` and compare
    /// against `limit`.
    ///
    /// # Errors
    ///
    /// Propagates runner failures; the caller must not submit in that case.
    pub async fn check_capacity(
        &self,
        category: &str,
        limit: u32,
    ) -> Result<AdmissionDecision, GateError> {
        let jobs = self
            .runner
            .list_in_flight(category, self.max_results)
            .await
            .map_err(|e| {
                tracing::error!(category, error = %e, "couldn't list in-flight jobs");
                e
            })?;
        if jobs.len() >= self.max_results {
            tracing::warn!(
                category,
                cap = self.max_results,
                "in-flight listing hit its cap, count may be low"
            );
        }
        let decision = AdmissionDecision::from_counts(limit, jobs.len());
        tracing::debug!(
            category,
            in_flight = jobs.len(),
            available = decision.available,
            limit,
            "checked capacity"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_arithmetic() {
        for limit in 0..5u32 {
            for in_flight in 0..7usize {
                let d = AdmissionDecision::from_counts(limit, in_flight);
                assert_eq!(d.available, i64::from(limit) - in_flight as i64);
                assert_eq!(d.is_admitted(), i64::from(limit) > in_flight as i64);
            }
        }
    }

    #[test]
    fn test_remaining_after_submit() {
        assert_eq!(AdmissionDecision::from_counts(1, 0).remaining_after_submit(), 0);
        assert_eq!(AdmissionDecision::from_counts(3, 1).remaining_after_submit(), 1);
        assert_eq!(AdmissionDecision::from_counts(1, 4).remaining_after_submit(), 0);
    }
}
