//! Error types for ingestion

use modelcat_domain::{ErrorCategory, ExtractionFailure};
use modelcat_extractor::{ExtractorError, InvalidInput};
use modelcat_gatekeeper::RejectionReason;
use thiserror::Error;

fn join_reasons(reasons: &[RejectionReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during ingestion
#[derive(Error, Debug)]
pub enum IngestError {
    /// Input text rejected before any upstream call
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Upstream extraction failed
    #[error("Extraction failed ({kind}, {attempts} attempt(s)): {message}")]
    Extraction {
        /// Category of the last upstream error
        kind: ErrorCategory,
        /// Message of the last upstream error
        message: String,
        /// Whether the upstream may recover
        retryable: bool,
        /// Attempts made
        attempts: u32,
    },

    /// Upstream fields failed validation
    #[error("Validation rejected: {}", join_reasons(.0))]
    Rejected(Vec<RejectionReason>),

    /// Feed source could not be read
    #[error("Feed error: {0}")]
    Feed(String),

    /// Ledger read or write failed
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Record store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Whether retrying the same input later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Extraction { retryable, .. } => *retryable,
            IngestError::Feed(_) | IngestError::Ledger(_) | IngestError::Store(_) => true,
            IngestError::InvalidInput(_) | IngestError::Rejected(_) | IngestError::Config(_) => false,
        }
    }
}

impl From<ExtractionFailure> for IngestError {
    fn from(failure: ExtractionFailure) -> Self {
        IngestError::Extraction {
            kind: failure.kind,
            message: failure.message,
            retryable: failure.retryable,
            attempts: failure.attempts,
        }
    }
}

impl From<ExtractorError> for IngestError {
    fn from(e: ExtractorError) -> Self {
        match e {
            ExtractorError::InvalidInput(input) => IngestError::InvalidInput(input),
            ExtractorError::Config(msg) => IngestError::Config(msg),
        }
    }
}

/// Errors that can occur while reading a feed
#[derive(Error, Debug)]
pub enum FeedError {
    /// Feed file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A feed entry could not be parsed
    #[error("Invalid entry at line {line}: {message}")]
    InvalidEntry {
        /// 1-based line (JSON lines) or entry index (JSON array)
        line: usize,
        /// What was wrong
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed endpoint answered with a non-success status
    #[error("Feed returned HTTP {0}")]
    Status(u16),

    /// Feed document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Feed source misconfigured
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_lists_reasons() {
        let err = IngestError::Rejected(vec![
            RejectionReason::Missing {
                field: "description".to_string(),
            },
            RejectionReason::Empty {
                field: "model_name".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Validation rejected: description: missing; model_name: empty"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_extraction_failure_keeps_retryable() {
        let err: IngestError = ExtractionFailure {
            kind: ErrorCategory::RateLimited,
            message: "slow down".to_string(),
            retryable: true,
            attempts: 3,
            delays: Vec::new(),
        }
        .into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("rate_limited"));
    }
}
