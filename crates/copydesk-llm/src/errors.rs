//! Inference errors.

/// Result type alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors talking to the LLM inference service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Service-specific error code.
        code: Option<String>,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// The call did not finish in time.
    #[error("LLM call timed out after {timeout_ms}ms")]
    Timeout {
        /// Elapsed budget in milliseconds.
        timeout_ms: u64,
    },

    /// The response could not be interpreted (e.g. output violating the schema).
    #[error("parse error: {message}")]
    Parse {
        /// Error description.
        message: String,
    },

    /// The response carried no choice to read.
    #[error("empty response from model")]
    EmptyResponse,

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl LlmError {
    /// Shorthand for a [`LlmError::Parse`].
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            Self::Json(_) | Self::Parse { .. } | Self::EmptyResponse | Self::Other { .. } => false,
        }
    }

    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::Parse { .. } | Self::EmptyResponse => "parse",
            Self::Api { .. } => "api",
            Self::Timeout { .. } => "timeout",
            Self::Other { .. } => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_and_retry() {
        let err = LlmError::Api {
            status: 503,
            message: "overloaded".into(),
            code: None,
            retryable: true,
        };
        assert_eq!(err.to_string(), "API error (503): overloaded");
        assert!(err.is_retryable());
        assert_eq!(err.category(), "api");
    }

    #[test]
    fn parse_error_not_retryable() {
        let err = LlmError::parse("missing field `post_content`");
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "parse");
        assert_eq!(err.to_string(), "parse error: missing field `post_content`");
    }

    #[test]
    fn timeout_display() {
        let err = LlmError::Timeout { timeout_ms: 60_000 };
        assert_eq!(err.to_string(), "LLM call timed out after 60000ms");
        assert_eq!(err.category(), "timeout");
    }

    #[tokio::test]
    async fn connect_failure_is_retryable() {
        let err = reqwest::Client::new()
            .get("http://[::1]:1")
            .timeout(std::time::Duration::from_nanos(1))
            .send()
            .await
            .unwrap_err();
        assert!(LlmError::Http(err).is_retryable());
    }
}
