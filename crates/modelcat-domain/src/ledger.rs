//! Deduplication ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key identifying where a feed item came from
///
/// Usually the item URL plus its publish timestamp, so a re-published
/// article with a new timestamp is treated as a new item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceKey(String);

impl SourceKey {
    /// Wrap an already-derived key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive a key from an item origin and optional publish timestamp
    ///
    /// # Examples
    ///
    /// ```
    /// use modelcat_domain::SourceKey;
    ///
    /// let key = SourceKey::from_origin("https://example.com/gpt-5", Some("2025-08-07"));
    /// assert_eq!(key.as_str(), "https://example.com/gpt-5#2025-08-07");
    ///
    /// let key = SourceKey::from_origin(" https://example.com/a ", None);
    /// assert_eq!(key.as_str(), "https://example.com/a");
    /// ```
    pub fn from_origin(origin: &str, published: Option<&str>) -> Self {
        let origin = origin.trim();
        match published.map(str::trim).filter(|p| !p.is_empty()) {
            Some(published) => Self(format!("{}#{}", origin, published)),
            None => Self(origin.to_string()),
        }
    }

    /// Key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of processing one feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOutcome {
    /// Produced a catalogue record
    Accepted,

    /// Failed at some stage; eligible for re-processing
    Rejected,

    /// Skipped because it was already accepted or in flight
    SkippedDuplicate,
}

impl ProcessingOutcome {
    /// Outcome name as stored in the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingOutcome::Accepted => "accepted",
            ProcessingOutcome::Rejected => "rejected",
            ProcessingOutcome::SkippedDuplicate => "skipped_duplicate",
        }
    }

    /// Parse a stored outcome name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(ProcessingOutcome::Accepted),
            "rejected" => Some(ProcessingOutcome::Rejected),
            "skipped_duplicate" => Some(ProcessingOutcome::SkippedDuplicate),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    /// Item origin key
    pub source_key: SourceKey,

    /// What happened
    pub outcome: ProcessingOutcome,

    /// When it was recorded
    pub recorded_at: DateTime<Utc>,

    /// Optional detail (rejection reason, created record id)
    pub detail: Option<String>,
}

impl ProcessingRecord {
    /// Create a record stamped with the current time
    pub fn now(source_key: SourceKey, outcome: ProcessingOutcome) -> Self {
        Self {
            source_key,
            outcome,
            recorded_at: Utc::now(),
            detail: None,
        }
    }

    /// Attach a detail string
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Result of a conditional ledger append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordResult {
    /// Entry appended
    Recorded,

    /// An accepted entry already exists for the key; nothing was written
    AlreadyAccepted,
}
