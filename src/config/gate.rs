//! Gate configuration and per-request overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, JobTag, StageVariables};

/// Prefix of environment variables read by [`GateConfig::from_env`].
pub const ENV_PREFIX: &str = "GATE_";

/// Root configuration, built once at process start and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Ledger table name.
    pub ledger_table: String,
    /// Default per-category concurrency limit.
    pub jobs_limit: u32,
    /// Default instance count per job.
    pub instance_count: u32,
    /// Default instance type.
    pub instance_type: String,
    /// Comma-separated allow-list of job categories.
    pub allow_list: String,
    /// Default storage bucket.
    pub s3_bucket: String,
    /// Default execution identity.
    pub role_arn: String,
    /// Account hosting the container registry.
    pub account_id: String,
    /// Region hosting the runner and registry.
    pub region: String,
    /// Cap on the in-flight listing used by admission.
    pub max_in_flight_query: usize,
    /// Static label attached to every submitted job.
    pub trace_tag: JobTag,
    /// Serialize check-then-submit within this process.
    pub serialize_admission: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ledger_table: "async-inf-jobs".into(),
            jobs_limit: 1,
            instance_count: 1,
            instance_type: "ml.g4dn.xlarge".into(),
            allow_list: "kwm-model-a, kwm-model-b".into(),
            s3_bucket: "sagemaker-studio-models".into(),
            role_arn: "arn:aws:iam::000000000000:role/service-role/AmazonSageMaker-ExecutionRole"
                .into(),
            account_id: "000000000000".into(),
            region: "us-east-1".into(),
            max_in_flight_query: 100,
            trace_tag: JobTag {
                key: "submitted-by".into(),
                value: "async-inference-gate".into(),
            },
            serialize_admission: false,
        }
    }
}

impl GateConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.ledger_table.trim().is_empty() {
            return Err("ledger_table must not be empty".into());
        }
        if self.jobs_limit == 0 {
            return Err("jobs_limit must be greater than 0".into());
        }
        if self.instance_count == 0 {
            return Err("instance_count must be greater than 0".into());
        }
        if self.instance_type.trim().is_empty() {
            return Err("instance_type must not be empty".into());
        }
        if parse_allow_list(&self.allow_list).is_empty() {
            return Err("allow_list must name at least one category".into());
        }
        if self.s3_bucket.trim().is_empty() {
            return Err("s3_bucket must not be empty".into());
        }
        if self.max_in_flight_query == 0 {
            return Err("max_in_flight_query must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment (after reading a
    /// `.env` file if present). Call once at startup.
    ///
    /// # Errors
    ///
    /// Fails when a numeric or boolean variable cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup, starting from defaults.
    /// Keys are the upper-case field names prefixed with [`ENV_PREFIX`].
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = get("LEDGER_TABLE") {
            cfg.ledger_table = v;
        }
        if let Some(v) = get("JOBS_LIMIT") {
            cfg.jobs_limit = v.trim().parse().context("GATE_JOBS_LIMIT")?;
        }
        if let Some(v) = get("INSTANCE_COUNT") {
            cfg.instance_count = v.trim().parse().context("GATE_INSTANCE_COUNT")?;
        }
        if let Some(v) = get("INSTANCE_TYPE") {
            cfg.instance_type = v;
        }
        if let Some(v) = get("ALLOW_LIST") {
            cfg.allow_list = v;
        }
        if let Some(v) = get("S3_BUCKET") {
            cfg.s3_bucket = v;
        }
        if let Some(v) = get("ROLE_ARN") {
            cfg.role_arn = v;
        }
        if let Some(v) = get("ACCOUNT_ID") {
            cfg.account_id = v;
        }
        if let Some(v) = get("REGION").or_else(|| lookup("AWS_REGION")) {
            cfg.region = v;
        }
        if let Some(v) = get("MAX_IN_FLIGHT_QUERY") {
            cfg.max_in_flight_query = v.trim().parse().context("GATE_MAX_IN_FLIGHT_QUERY")?;
        }
        if let Some(v) = get("SERIALIZE_ADMISSION") {
            cfg.serialize_admission = v.trim().parse().context("GATE_SERIALIZE_ADMISSION")?;
        }

        cfg.validate()
            .map_err(|e| anyhow::anyhow!(e))
            .context("invalid gate configuration")?;
        Ok(cfg)
    }
}

/// Split a comma-separated allow-list into trimmed, non-empty categories.
#[must_use]
pub fn parse_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Effective settings for one request: configuration plus stage overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    /// Storage bucket.
    pub s3_bucket: String,
    /// Allowed categories.
    pub allow_list: Vec<String>,
    /// Execution identity.
    pub role_arn: String,
    /// Concurrency limit.
    pub limit: u32,
}

impl RequestSettings {
    /// Apply `stage` overrides on top of `cfg`. Unusable limits are ignored.
    #[must_use]
    pub fn resolve(cfg: &GateConfig, stage: &StageVariables) -> Self {
        let limit = match &stage.limit {
            None => cfg.jobs_limit,
            Some(raw) => raw.positive().unwrap_or_else(|| {
                tracing::warn!(?raw, fallback = cfg.jobs_limit, "ignoring unusable limit override");
                cfg.jobs_limit
            }),
        };
        let allow_list = stage
            .white_list
            .as_deref()
            .map_or_else(|| parse_allow_list(&cfg.allow_list), parse_allow_list);

        Self {
            s3_bucket: stage.s3_bucket.clone().unwrap_or_else(|| cfg.s3_bucket.clone()),
            allow_list,
            role_arn: stage.role_arn.clone().unwrap_or_else(|| cfg.role_arn.clone()),
            limit,
        }
    }

    /// Exact (whitespace-trimmed) allow-list membership.
    #[must_use]
    pub fn allows(&self, category: &str) -> bool {
        self.allow_list.iter().any(|c| c == category)
    }
}
