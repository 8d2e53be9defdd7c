//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and its
//! collaborators. Implementations live in other crates (`modelcat-llm`,
//! `modelcat-store`, `modelcat-ingest`) or outside the workspace.

use crate::{
    EntityKind, FeedItem, ProcessingRecord, RecordId, RecordResult, SourceKey, UpstreamCall,
    UpstreamError, UpstreamResponse, ValidatedEntity,
};
use async_trait::async_trait;
use std::fmt::Display;

/// Remote structured-extraction service
///
/// Implemented by the infrastructure layer (modelcat-llm). One call is one
/// attempt; retries are the caller's concern.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Identifier of the upstream model used for extraction
    fn model_name(&self) -> &str;

    /// Perform a single extraction attempt
    async fn extract(&self, call: &UpstreamCall) -> Result<UpstreamResponse, UpstreamError>;
}

/// Result of a record store insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Record persisted under the given id
    Created(RecordId),

    /// A record with the same natural key already exists
    Conflict(String),
}

/// Catalogue persistence
///
/// The pipeline only ever creates records; reads and updates belong to the
/// request-serving layer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Error type for store operations
    type Error: Display + Send + Sync + 'static;

    /// Insert a validated entity
    async fn create(&self, entity: &ValidatedEntity) -> Result<CreateOutcome, Self::Error>;

    /// Look up a record by kind and natural key
    async fn find_by_key(&self, kind: EntityKind, key: &str)
        -> Result<Option<RecordId>, Self::Error>;
}

/// Durable, append-only deduplication ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Error type for ledger operations
    type Error: Display + Send + Sync + 'static;

    /// Whether an accepted entry exists for the key
    async fn has_accepted(&self, key: &SourceKey) -> Result<bool, Self::Error>;

    /// Most recent entry for the key
    async fn latest(&self, key: &SourceKey) -> Result<Option<ProcessingRecord>, Self::Error>;

    /// All entries for the key, oldest first
    async fn history(&self, key: &SourceKey) -> Result<Vec<ProcessingRecord>, Self::Error>;

    /// Append an entry
    ///
    /// Must be atomic per key: appending an accepted entry when one already
    /// exists writes nothing and returns [`RecordResult::AlreadyAccepted`].
    async fn append(&self, record: ProcessingRecord) -> Result<RecordResult, Self::Error>;
}

/// Source of raw items for the batch path
///
/// Pull-based and idempotent: items already returned may be returned again.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Error type for fetch operations
    type Error: Display + Send + Sync + 'static;

    /// Fetch every item currently pending
    async fn fetch_pending(&self) -> Result<Vec<FeedItem>, Self::Error>;
}
