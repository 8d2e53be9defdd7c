//! Typed results of an upstream extraction call

use crate::request::TokenUsage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Machine-readable category of an upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Upstream rate limit hit (HTTP 429)
    RateLimited,

    /// Upstream transient/server error (HTTP 5xx, overloaded)
    ServerError,

    /// Connection could not be established or was dropped
    Connection,

    /// Attempt exceeded the per-attempt timeout
    Timeout,

    /// Malformed request (HTTP 400/422)
    BadRequest,

    /// Authentication or authorization failure (HTTP 401/403)
    Unauthorized,

    /// Unknown endpoint or model (HTTP 404)
    NotFound,

    /// Upstream answered but the body could not be interpreted
    InvalidResponse,
}

impl ErrorCategory {
    /// Whether a failure of this category may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimited
                | ErrorCategory::ServerError
                | ErrorCategory::Connection
                | ErrorCategory::Timeout
        )
    }

    /// Category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::Connection => "connection",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::BadRequest => "bad_request",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by an extraction backend for a single attempt
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{category}: {message}")]
pub struct UpstreamError {
    /// Failure category
    pub category: ErrorCategory,

    /// Human-readable detail
    pub message: String,
}

impl UpstreamError {
    /// Create a new upstream error
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Whether this error may succeed on retry
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

/// Successful extraction, after any retries
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSuccess {
    /// Raw field map returned by the upstream
    pub fields: Map<String, Value>,

    /// Total tokens consumed by the successful attempt
    pub tokens_used: u64,

    /// Upstream model identifier
    pub model: String,

    /// Detailed token accounting
    pub usage: TokenUsage,

    /// Number of attempts made (1 = no retry)
    pub attempts: u32,

    /// Backoff delays slept between attempts
    pub delays: Vec<Duration>,
}

/// Failed extraction, after retries were exhausted or refused
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionFailure {
    /// Category of the last error
    pub kind: ErrorCategory,

    /// Message of the last error
    pub message: String,

    /// Whether the upstream may recover (distinguishes outage from data problem)
    pub retryable: bool,

    /// Number of attempts made
    pub attempts: u32,

    /// Backoff delays slept between attempts
    pub delays: Vec<Duration>,
}

/// Tagged result of one extraction call
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Upstream returned a field map
    Success(ExtractionSuccess),

    /// Upstream call failed
    Failure(ExtractionFailure),
}

impl ExtractionOutcome {
    /// Number of attempts made, whatever the result
    pub fn attempts(&self) -> u32 {
        match self {
            ExtractionOutcome::Success(s) => s.attempts,
            ExtractionOutcome::Failure(f) => f.attempts,
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(ErrorCategory::RateLimited.is_retryable());
        assert!(ErrorCategory::ServerError.is_retryable());
        assert!(ErrorCategory::Connection.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::Unauthorized.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::InvalidResponse.is_retryable());
    }

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::new(ErrorCategory::RateLimited, "slow down");
        assert_eq!(err.to_string(), "rate_limited: slow down");
        assert!(err.is_retryable());
    }
}
