//! Job-runner collaborator abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GateError, JobStatus};

/// Summary row returned when listing jobs on the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Runner-assigned job name.
    pub job_name: String,
    /// Current status.
    pub status: JobStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Key/value label attached to submitted jobs for traceability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// Fully resolved submission sent to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJobSpec {
    /// Job name to register.
    pub job_name: String,
    /// Container image reference.
    pub image_uri: String,
    /// Execution identity.
    pub role_arn: String,
    /// Number of instances.
    pub instance_count: u32,
    /// Instance type.
    pub instance_type: String,
    /// Input channel name to input location.
    pub input_channels: Vec<(String, String)>,
    /// Output location.
    pub output_path: String,
    /// Code location.
    pub code_location: String,
    /// Tags attached to the job.
    pub tags: Vec<JobTag>,
}

/// External compute-job runner.
///
/// Implementations talk to the real service; the crate ships an in-memory
/// runner for tests and local use.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    /// List in-flight jobs whose name contains `name_contains`, returning at
    /// most `max_results` rows.
    async fn list_in_flight(
        &self,
        name_contains: &str,
        max_results: usize,
    ) -> Result<Vec<JobSummary>, GateError>;

    /// Submit a job and return the name the runner registered. Returns as
    /// soon as the runner accepts the submission.
    async fn submit(&self, spec: TrainingJobSpec) -> Result<String, GateError>;
}
