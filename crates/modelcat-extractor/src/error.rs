//! Error types for the Extractor

use thiserror::Error;

/// Input rejected before any upstream call is made
///
/// Local and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    /// Text is empty or whitespace only
    #[error("Input text is empty")]
    Empty,

    /// Text exceeds the configured maximum
    #[error("Text too long: {0} chars (max: {1})")]
    TooLong(usize, usize),
}

/// Errors that can occur while setting up or running extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Input text rejected
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
