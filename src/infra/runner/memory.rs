//! In-memory job runner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::{GateError, JobRunner, JobStatus, JobSummary, TrainingJobSpec};

/// Job tracked by the in-memory runner.
#[derive(Debug, Clone)]
pub struct RunnerJob {
    /// Job name (unique).
    pub job_name: String,
    /// Current status.
    pub status: JobStatus,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Submission, absent for seeded jobs.
    pub spec: Option<TrainingJobSpec>,
}

/// Runner keeping its job table in memory, for development/testing.
///
/// Submitted jobs start `InProgress`. Job names are unique: a second
/// submission with a name already in use is rejected with
/// [`GateError::Conflict`].
#[derive(Default)]
pub struct InMemoryJobRunner {
    jobs: Mutex<Vec<RunnerJob>>,
}

impl InMemoryJobRunner {
    /// Create an empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job directly, bypassing submission.
    pub fn seed(&self, job_name: impl Into<String>, status: JobStatus) {
        self.jobs.lock().push(RunnerJob {
            job_name: job_name.into(),
            status,
            created_at: Utc::now(),
            spec: None,
        });
    }

    /// Move a job to `status`.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] for an unknown job.
    pub fn set_status(&self, job_name: &str, status: JobStatus) -> Result<(), GateError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .iter_mut()
            .find(|j| j.job_name == job_name)
            .ok_or_else(|| GateError::NotFound(format!("job {job_name}")))?;
        job.status = status;
        Ok(())
    }

    /// Snapshot of all jobs in registration order.
    pub fn jobs(&self) -> Vec<RunnerJob> {
        self.jobs.lock().clone()
    }

    /// Names of jobs that went through [`JobRunner::submit`].
    pub fn submitted_names(&self) -> Vec<String> {
        self.jobs
            .lock()
            .iter()
            .filter(|j| j.spec.is_some())
            .map(|j| j.job_name.clone())
            .collect()
    }
}

#[async_trait]
impl JobRunner for InMemoryJobRunner {
    async fn list_in_flight(
        &self,
        name_contains: &str,
        max_results: usize,
    ) -> Result<Vec<JobSummary>, GateError> {
        Ok(self
            .jobs
            .lock()
            .iter()
            .filter(|j| j.status.is_in_flight() && j.job_name.contains(name_contains))
            .take(max_results)
            .map(|j| JobSummary {
                job_name: j.job_name.clone(),
                status: j.status.clone(),
                created_at: j.created_at,
            })
            .collect())
    }

    async fn submit(&self, spec: TrainingJobSpec) -> Result<String, GateError> {
        let mut jobs = self.jobs.lock();
        if jobs.iter().any(|j| j.job_name == spec.job_name) {
            return Err(GateError::Conflict(format!(
                "job name {} already in use",
                spec.job_name
            )));
        }
        let job_name = spec.job_name.clone();
        jobs.push(RunnerJob {
            job_name: job_name.clone(),
            status: JobStatus::InProgress,
            created_at: Utc::now(),
            spec: Some(spec),
        });
        Ok(job_name)
    }
}
