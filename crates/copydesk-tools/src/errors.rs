//! Tool error types.
//!
//! Every variant is recoverable: the dispatcher folds it into the
//! conversation as a degradation notice and the phase continues.

use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments missing or malformed.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// The call did not finish in time.
    #[error("timeout after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The provider answered with a failure status.
    #[error("provider error ({status}): {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body or description.
        message: String,
    },

    /// The provider reply could not be interpreted.
    #[error("invalid tool output: {message}")]
    InvalidOutput {
        /// Description of the problem.
        message: String,
    },

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (catch-all).
    #[error("{message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ToolError {
    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Timeout { .. } => "timeout",
            Self::Provider { .. } | Self::Http(_) => "provider",
            Self::InvalidOutput { .. } | Self::Json(_) => "output",
            Self::Internal { .. } => "internal",
        }
    }
}
