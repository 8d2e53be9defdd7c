//! Modelcat Domain Layer
//!
//! Core types and collaborator interfaces for the model catalogue
//! ingestion pipeline. Every other crate in the workspace depends on this one.
//!
//! ## Key Concepts
//!
//! - **Entity kind**: which catalogue table an extraction targets
//!   (models, benchmarks, benchmark results, opinions)
//! - **Extraction request**: immutable instructional context plus the
//!   variable input text
//! - **Extraction outcome**: tagged success/failure of one upstream call,
//!   with retryability explicit in the type
//! - **Validated entity**: a fully typed draft record plus a confidence marker
//! - **Processing record**: one entry of the deduplication ledger
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Infrastructure implementations (HTTP backends, SQLite) live in other crates
//! - Trait definitions for every external interaction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod feed;
pub mod ledger;
pub mod outcome;
pub mod request;
pub mod traits;

// Re-exports for convenience
pub use entity::{
    BenchmarkDraft, BenchmarkResultDraft, Confidence, EntityDraft, EntityKind, ModelDraft,
    OpinionDraft, RecordId, ValidatedEntity,
};
pub use feed::FeedItem;
pub use ledger::{ProcessingOutcome, ProcessingRecord, RecordResult, SourceKey};
pub use outcome::{ErrorCategory, ExtractionFailure, ExtractionOutcome, ExtractionSuccess, UpstreamError};
pub use request::{
    ContentHash, ContextBlock, ContextMode, ExtractionRequest, PromptSegment, TokenUsage,
    UpstreamCall, UpstreamResponse,
};
