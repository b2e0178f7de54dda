//! Job submission to the external runner.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GateError, JobRunner, RequestPayload, TrainingJobSpec};
use crate::config::{GateConfig, RequestSettings};
use crate::util::clock::job_timestamp;

/// Input channel name the training data is mounted under.
pub const TRAINING_CHANNEL: &str = "training-data";

/// Validated job request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Allow-listed category.
    pub category: String,
    /// Number of instances (positive).
    pub instance_count: u32,
    /// Instance type.
    pub instance_type: String,
    /// Input data location.
    pub s3_data_location: String,
    /// Output location.
    pub s3_output_location: String,
    /// Code location.
    pub code_location: String,
    /// Execution identity.
    pub role_identity: String,
}

impl JobRequest {
    /// Build a request from a decoded payload, falling back to configured
    /// defaults for the optional fields.
    ///
    /// # Errors
    ///
    /// [`GateError::MalformedRequest`] for a zero instance count or an empty
    /// instance type.
    pub fn build(
        category: &str,
        payload: &RequestPayload,
        settings: &RequestSettings,
        cfg: &GateConfig,
    ) -> Result<Self, GateError> {
        let instance_count = payload.instance_count.unwrap_or(cfg.instance_count);
        if instance_count == 0 {
            return Err(GateError::MalformedRequest(
                "instance_count must be greater than 0".into(),
            ));
        }
        let instance_type = payload
            .instance_type
            .clone()
            .unwrap_or_else(|| cfg.instance_type.clone());
        if instance_type.trim().is_empty() {
            return Err(GateError::MalformedRequest(
                "instance_type must not be empty".into(),
            ));
        }
        let bucket = &settings.s3_bucket;
        Ok(Self {
            category: category.to_string(),
            instance_count,
            instance_type,
            s3_data_location: format!("s3://{bucket}/data/"),
            s3_output_location: format!("s3://{bucket}/output/"),
            code_location: format!("s3://{bucket}/source-folders"),
            role_identity: settings.role_arn.clone(),
        })
    }
}

/// Handle to a submitted job. Only the name is used afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Name the runner registered.
    pub job_name: String,
    /// Category of the job.
    pub category: String,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// `{category}-job-{UTC timestamp, second precision}`.
///
/// Two submissions of one category within the same second produce the same
/// name; whether the second one is accepted is up to the runner.
#[must_use]
pub fn job_name_for(category: &str, at: DateTime<Utc>) -> String {
    format!("{category}-job-{}", job_timestamp(at))
}

/// Registry domain suffix for the region's partition.
#[must_use]
pub fn partition_suffix(region: &str) -> &'static str {
    if region.contains("cn-north") {
        ".cn"
    } else {
        ""
    }
}

/// Container image for a category, `latest` tag.
#[must_use]
pub fn container_image_uri(account_id: &str, region: &str, category: &str) -> String {
    format!(
        "{account_id}.dkr.ecr.{region}.amazonaws.com{}/{category}:latest",
        partition_suffix(region)
    )
}

/// Submits validated requests to the runner without waiting for completion.
pub struct JobDispatcher<R> {
    runner: Arc<R>,
    config: Arc<GateConfig>,
}

impl<R: JobRunner> JobDispatcher<R> {
    /// Create a dispatcher.
    pub fn new(runner: Arc<R>, config: Arc<GateConfig>) -> Self {
        Self { runner, config }
    }

    /// Reject categories missing from the allow-list. Must run before any
    /// capacity check.
    ///
    /// # Errors
    ///
    /// [`GateError::UnsupportedCategory`] when `category` is not allowed.
    pub fn check_category(
        &self,
        category: &str,
        settings: &RequestSettings,
    ) -> Result<(), GateError> {
        if settings.allows(category) {
            Ok(())
        } else {
            tracing::warn!(category, allow_list = ?settings.allow_list, "unsupported category");
            Err(GateError::UnsupportedCategory(category.to_string()))
        }
    }

    /// Submit `request` now.
    ///
    /// # Errors
    ///
    /// Propagates runner rejections; nothing is retained locally on failure.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobHandle, GateError> {
        self.submit_at(request, Utc::now()).await
    }

    /// Submit `request` as of `at`, which determines the job name.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_at(
        &self,
        request: &JobRequest,
        at: DateTime<Utc>,
    ) -> Result<JobHandle, GateError> {
        let spec = self.spec_for(request, at);
        let requested = spec.job_name.clone();
        tracing::debug!(job_name = %requested, image = %spec.image_uri, "submitting job");

        let job_name = self.runner.submit(spec).await.map_err(|e| {
            tracing::error!(job_name = %requested, error = %e, "runner rejected submission");
            e
        })?;
        tracing::info!(%job_name, category = %request.category, "starting training job");

        Ok(JobHandle {
            job_name,
            category: request.category.clone(),
            submitted_at: at,
        })
    }

    fn spec_for(&self, request: &JobRequest, at: DateTime<Utc>) -> TrainingJobSpec {
        TrainingJobSpec {
            job_name: job_name_for(&request.category, at),
            image_uri: container_image_uri(
                &self.config.account_id,
                &self.config.region,
                &request.category,
            ),
            role_arn: request.role_identity.clone(),
            instance_count: request.instance_count,
            instance_type: request.instance_type.clone(),
            input_channels: vec![(
                TRAINING_CHANNEL.to_string(),
                request.s3_data_location.clone(),
            )],
            output_path: request.s3_output_location.clone(),
            code_location: request.code_location.clone(),
            tags: vec![self.config.trace_tag.clone()],
        }
    }
}
