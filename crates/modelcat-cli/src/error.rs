//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion error
    #[error(transparent)]
    Ingest(#[from] modelcat_ingest::IngestError),

    /// Feed error
    #[error("Feed error: {0}")]
    Feed(#[from] modelcat_ingest::FeedError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] modelcat_store::StoreError),

    /// Upstream backend error
    #[error("Backend error: {0}")]
    Llm(#[from] modelcat_llm::LlmError),

    /// Extractor setup error
    #[error("Extractor error: {0}")]
    Extractor(#[from] modelcat_extractor::ExtractorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
