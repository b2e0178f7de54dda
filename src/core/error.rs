//! Error types for admission and completion handling.

use thiserror::Error;

/// Errors produced by gate components and their collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Request body is empty or carries no `type`.
    #[error("missing \"type\" in your request, please check and try again.")]
    MissingType,
    /// Request body is not decodable.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// Category is not present in the allow-list.
    #[error("The type [{0}] of inference request is NOT supported.")]
    UnsupportedCategory(String),
    /// No admission slot left for the category.
    #[error("Failed to schedule inference at the moment, due to limit {limit} got reached.")]
    CapacityExceeded {
        /// Limit that was in force for the request.
        limit: u32,
    },
    /// Backing resource (table, job) does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// Backing store or runner refused a write because of an existing resource.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Collaborator failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// Invalid configuration.
    #[error("config invalid: {0}")]
    Config(String),
}

impl GateError {
    /// Status code carried by the response envelope for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingType => 501,
            Self::CapacityExceeded { .. } => 502,
            Self::UnsupportedCategory(_) => 510,
            Self::MalformedRequest(_) => 400,
            Self::NotFound(_) | Self::Conflict(_) | Self::Backend(_) | Self::Config(_) => 500,
        }
    }

    /// True for failures caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingType | Self::MalformedRequest(_) | Self::UnsupportedCategory(_)
        )
    }

    /// True for failures raised by the runner or the ledger store.
    #[must_use]
    pub const fn is_collaborator_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Conflict(_) | Self::Backend(_))
    }
}

/// Application-facing result using anyhow for startup contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
