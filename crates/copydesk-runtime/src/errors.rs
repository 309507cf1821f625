//! Runtime error types.
//!
//! Almost everything that goes wrong inside a request is folded into the
//! content as a degradation. [`RuntimeError`] is what is left: the model
//! never answered at all.

use copydesk_llm::LlmError;

/// Errors that surface past the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The inference service was unavailable for the whole request.
    #[error("Inference error: {0}")]
    Inference(#[from] LlmError),

    /// Internal / unexpected error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Whether retrying the request may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Inference(e) => e.is_retryable(),
            Self::Internal(_) => false,
        }
    }

    /// Error category string for logs.
    pub fn category(&self) -> &str {
        match self {
            Self::Inference(_) => "inference",
            Self::Internal(_) => "internal",
        }
    }
}
