//! Feed items handed to the batch path

use crate::entity::EntityKind;
use crate::ledger::SourceKey;
use serde::{Deserialize, Serialize};

/// One raw item pulled from a feed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Stable origin key used for deduplication
    pub source_key: SourceKey,

    /// Free-form text to extract from
    pub raw_text: String,

    /// Entity kind hint; the orchestrator's default kind is used when absent
    #[serde(default)]
    pub kind: Option<EntityKind>,
}

impl FeedItem {
    /// Create an item without a kind hint
    pub fn new(source_key: SourceKey, raw_text: impl Into<String>) -> Self {
        Self {
            source_key,
            raw_text: raw_text.into(),
            kind: None,
        }
    }

    /// Set the entity kind hint
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }
}
