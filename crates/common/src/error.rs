//! Common error taxonomy shared across pipeline services.
//!
//! Mirrors the error-handling design in spec §7: transient I/O errors are
//! recoverable by retry-then-degrade, validation errors are surfaced to the
//! caller, policy errors are downstream-visible flags rather than failures,
//! and fatal errors abort startup.

use thiserror::Error;

/// Errors that can occur across pipeline services.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Broker unreachable, publish failed, or consumer poll failed.
    #[error("broker error: {0}")]
    Broker(String),

    /// An outbound RPC (registry or scorer) failed or timed out.
    #[error("rpc error calling {service}: {message}")]
    Rpc {
        /// Name of the peer service that was called.
        service: &'static str,
        /// Human-readable failure detail.
        message: String,
    },

    /// Cache (Redis) operation failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Envelope or payload failed validation (malformed input).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Required configuration is missing or invalid; fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Generic internal error that does not fit another variant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether this error represents a transient condition worth retrying
    /// before degrading, per spec §7's error taxonomy.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Broker(_) | PipelineError::Rpc { .. } | PipelineError::Cache(_)
        )
    }
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
