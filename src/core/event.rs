//! Inbound event model.
//!
//! Two incompatible payload shapes reach the gate: job-runner completion
//! notifications (carrying a `detail` block) and new job requests (carrying a
//! JSON `body` string plus deployment `stageVariables`). The shape is decided
//! once in [`InboundEvent::from_value`]; everything downstream matches on the
//! variant.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GateError;

/// Lifecycle status reported by the job runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Job is running.
    InProgress,
    /// Job finished successfully.
    Completed,
    /// Job failed.
    Failed,
    /// Job is being stopped.
    Stopping,
    /// Job was stopped before finishing.
    Stopped,
    /// Any status this crate does not model.
    Other(String),
}

impl JobStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Other(s) => s,
        }
    }

    /// True while the runner still counts the job against concurrency.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::InProgress | Self::Stopping)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "InProgress" => Self::InProgress,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Stopping" => Self::Stopping,
            "Stopped" => Self::Stopped,
            _ => Self::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output block of a completion notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataConfig {
    /// Location the job wrote its output to.
    #[serde(rename = "S3OutputPath", default)]
    pub s3_output_path: String,
}

/// Completion notification delivered (at least once) by the job runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Name of the job the event is about.
    #[serde(rename = "TrainingJobName")]
    pub job_name: String,
    /// Status reported by the runner.
    #[serde(rename = "TrainingJobStatus")]
    pub status: JobStatus,
    /// Output location block.
    #[serde(rename = "OutputDataConfig", default)]
    pub output: OutputDataConfig,
}

impl CompletionEvent {
    /// Build an event without going through JSON.
    pub fn new(
        job_name: impl Into<String>,
        status: JobStatus,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            status,
            output: OutputDataConfig {
                s3_output_path: output_location.into(),
            },
        }
    }

    /// Output location reported for the job.
    #[must_use]
    pub fn output_location(&self) -> &str {
        &self.output.s3_output_path
    }
}

/// Decoded request body of a new job request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Requested job category.
    #[serde(rename = "type", default)]
    pub category: Option<String>,
    /// Requested instance count.
    #[serde(default)]
    pub instance_count: Option<u32>,
    /// Requested instance type.
    #[serde(default)]
    pub instance_type: Option<String>,
}

/// Concurrency limit as carried by stage variables (string or number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageLimit {
    /// Numeric form.
    Number(i64),
    /// Textual form, as API gateways deliver stage variables.
    Text(String),
}

impl StageLimit {
    /// Positive limit, or `None` when the value is unusable.
    #[must_use]
    pub fn positive(&self) -> Option<u32> {
        let raw = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<i64>().ok()?,
        };
        u32::try_from(raw).ok().filter(|n| *n > 0)
    }
}

/// Deployment-time overrides attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageVariables {
    /// Storage bucket override.
    #[serde(default)]
    pub s3_bucket: Option<String>,
    /// Comma-separated allow-list override.
    #[serde(default)]
    pub white_list: Option<String>,
    /// Execution identity override.
    #[serde(default)]
    pub role_arn: Option<String>,
    /// Concurrency limit override.
    #[serde(default)]
    pub limit: Option<StageLimit>,
}

/// New job request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRequestEvent {
    /// Decoded body; `None` when the body is absent or an empty object.
    pub payload: Option<RequestPayload>,
    /// Deployment overrides.
    pub stage_variables: StageVariables,
}

/// Inbound event, classified once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Job-runner completion notification.
    Completion(CompletionEvent),
    /// New job request.
    NewRequest(NewRequestEvent),
}

impl InboundEvent {
    /// Classify and decode a raw event.
    ///
    /// A non-empty `detail` object marks a completion notification. Anything
    /// else is a new request whose `body` is either a JSON string or an
    /// already-decoded object.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MalformedRequest`] when the selected shape cannot
    /// be decoded.
    pub fn from_value(value: &Value) -> Result<Self, GateError> {
        if let Some(detail) = value
            .get("detail")
            .filter(|d| d.as_object().is_some_and(|m| !m.is_empty()))
        {
            let event = serde_json::from_value::<CompletionEvent>(detail.clone())
                .map_err(|e| GateError::MalformedRequest(format!("completion detail: {e}")))?;
            return Ok(Self::Completion(event));
        }

        let payload = match value.get("body") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(Value::String(raw)) => {
                let decoded: Value = serde_json::from_str(raw)
                    .map_err(|e| GateError::MalformedRequest(format!("body: {e}")))?;
                decode_payload(decoded)?
            }
            Some(other) => decode_payload(other.clone())?,
        };

        let stage_variables = match value.get("stageVariables") {
            None | Some(Value::Null) => StageVariables::default(),
            Some(vars) => serde_json::from_value(vars.clone())
                .map_err(|e| GateError::MalformedRequest(format!("stageVariables: {e}")))?,
        };

        Ok(Self::NewRequest(NewRequestEvent {
            payload,
            stage_variables,
        }))
    }
}

fn decode_payload(decoded: Value) -> Result<Option<RequestPayload>, GateError> {
    match decoded {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => serde_json::from_value(Value::Object(map))
            .map(Some)
            .map_err(|e| GateError::MalformedRequest(format!("body: {e}"))),
        other => Err(GateError::MalformedRequest(format!(
            "body must be a JSON object, got {other}"
        ))),
    }
}

/// Synchronous outcome of one inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Status code (200 accepted, 501/502/510 rejections, 5xx failures).
    pub status_code: u16,
    /// Human-readable message.
    pub message: String,
}

impl Response {
    /// Successful response.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
        }
    }

    /// Response describing an error.
    #[must_use]
    pub fn from_error(err: &GateError) -> Self {
        Self {
            status_code: err.status_code(),
            message: err.to_string(),
        }
    }

    /// True for 200 responses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
