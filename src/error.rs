//! Error types for alimgen
//!
//! Centralized error handling using thiserror. External-call failures are
//! absorbed at stage boundaries by the workflow; only index construction and
//! caller-side validation surface to the API boundary.

use thiserror::Error;

/// All error types that can occur in alimgen
#[derive(Debug, Error)]
pub enum AlimgenError {
    /// External model or vector store exceeded its timeout
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Network or auth failure on an external call
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// External JSON response not parseable into the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller-supplied request fails structural validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Retrieval indexing failed at startup
    #[error("Index build error: {0}")]
    IndexBuild(String),

    /// Logic bug; always fatal for the request
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlimgenError {
    /// Stable machine-readable code recorded in `workflow_info.errors`.
    pub fn code(&self) -> &'static str {
        match self {
            AlimgenError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            AlimgenError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AlimgenError::Parse(_) => "PARSE_ERROR",
            AlimgenError::Validation(_) => "VALIDATION_ERROR",
            AlimgenError::IndexBuild(_) => "INDEX_BUILD_ERROR",
            AlimgenError::Internal(_) => "INTERNAL_ERROR",
            AlimgenError::Io(_) => "IO_ERROR",
            AlimgenError::Json(_) => "JSON_ERROR",
        }
    }

    /// True for failures that stage fallbacks are allowed to absorb.
    pub fn is_absorbable(&self) -> bool {
        matches!(
            self,
            AlimgenError::UpstreamTimeout(_)
                | AlimgenError::UpstreamUnavailable(_)
                | AlimgenError::Parse(_)
                | AlimgenError::Json(_)
        )
    }
}

/// Result type alias for alimgen operations
pub type Result<T> = std::result::Result<T, AlimgenError>;
