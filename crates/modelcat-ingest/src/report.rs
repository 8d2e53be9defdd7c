//! Batch run reports

use chrono::{DateTime, Utc};
use modelcat_domain::SourceKey;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Stage at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Ledger could not be read or written
    Ledger,
    /// Input text rejected before the upstream call
    Input,
    /// Upstream call failed
    Extraction,
    /// Fields failed validation
    Validation,
    /// A record with the same natural key already exists
    Conflict,
    /// Record store failed
    Store,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Ledger => "ledger",
            FailureStage::Input => "input",
            FailureStage::Extraction => "extraction",
            FailureStage::Validation => "validation",
            FailureStage::Conflict => "conflict",
            FailureStage::Store => "store",
        };
        f.write_str(s)
    }
}

/// One failed item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    /// Item key
    pub source_key: SourceKey,
    /// Where it failed
    pub stage: FailureStage,
    /// Error message
    pub message: String,
    /// Whether a later run may succeed
    pub retryable: bool,
}

/// Final disposition of one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDisposition {
    /// Record created
    Accepted,
    /// Already accepted or in flight
    Skipped,
    /// Failed at some stage
    Failed(ItemFailure),
}

/// What happened to one item in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    /// Item key
    pub source_key: SourceKey,
    /// Final disposition
    pub disposition: ItemDisposition,
    /// Tokens spent on the item, including failed validations
    pub tokens_used: u64,
}

impl ItemReport {
    /// Accepted item
    pub fn accepted(source_key: SourceKey, tokens_used: u64) -> Self {
        Self {
            source_key,
            disposition: ItemDisposition::Accepted,
            tokens_used,
        }
    }

    /// Skipped item
    pub fn skipped(source_key: SourceKey) -> Self {
        Self {
            source_key,
            disposition: ItemDisposition::Skipped,
            tokens_used: 0,
        }
    }

    /// Failed item
    pub fn failed(
        source_key: SourceKey,
        stage: FailureStage,
        message: impl Into<String>,
        retryable: bool,
        tokens_used: u64,
    ) -> Self {
        let failure = ItemFailure {
            source_key: source_key.clone(),
            stage,
            message: message.into(),
            retryable,
        };
        Self {
            source_key,
            disposition: ItemDisposition::Failed(failure),
            tokens_used,
        }
    }
}

/// Summary of one batch run
///
/// Every attempted item lands in exactly one of `accepted`, `failed` or
/// `skipped`. Natural-key conflicts count as failures and are also tallied
/// in `conflicts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRun {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Items returned by the feed
    pub fetched: usize,
    /// Items the run started on
    pub attempted: usize,
    /// Items that produced a record
    pub accepted: usize,
    /// Items that failed at any stage
    pub failed: usize,
    /// Items skipped as duplicates
    pub skipped: usize,
    /// Failures caused by an existing record with the same natural key
    pub conflicts: usize,
    /// Tokens consumed across all items
    pub tokens_used: u64,
    /// Whether the run was cancelled before every item started
    pub cancelled: bool,
    /// Per-item failure details
    pub failures: Vec<ItemFailure>,
}

impl BatchRun {
    /// Start an empty report
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            fetched: 0,
            attempted: 0,
            accepted: 0,
            failed: 0,
            skipped: 0,
            conflicts: 0,
            tokens_used: 0,
            cancelled: false,
            failures: Vec::new(),
        }
    }

    /// Fold one item into the totals
    pub fn record(&mut self, item: ItemReport) {
        self.attempted += 1;
        self.tokens_used += item.tokens_used;
        match item.disposition {
            ItemDisposition::Accepted => self.accepted += 1,
            ItemDisposition::Skipped => self.skipped += 1,
            ItemDisposition::Failed(failure) => {
                self.failed += 1;
                if failure.stage == FailureStage::Conflict {
                    self.conflicts += 1;
                }
                self.failures.push(failure);
            }
        }
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Items fetched but never started
    pub fn not_started(&self) -> usize {
        self.fetched.saturating_sub(self.attempted)
    }

    /// Wall-clock duration, if finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Failure counts per stage
    pub fn failures_by_stage(&self) -> BTreeMap<FailureStage, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.stage).or_insert(0) += 1;
        }
        counts
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Batch Run Summary".to_string(),
            "=================".to_string(),
            format!("Fetched: {}", self.fetched),
            format!("Attempted: {}", self.attempted),
            format!("Accepted: {}", self.accepted),
            format!("Skipped: {}", self.skipped),
            format!("Failed: {} ({} conflicts)", self.failed, self.conflicts),
            format!("Tokens used: {}", self.tokens_used),
        ];

        if let Some(duration) = self.duration() {
            lines.push(format!("Duration: {}ms", duration.num_milliseconds()));
        }

        if self.cancelled {
            lines.push(format!("Cancelled: {} item(s) not started", self.not_started()));
        }

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push("Failures by stage:".to_string());
            for (stage, count) in self.failures_by_stage() {
                lines.push(format!("  {}: {}", stage, count));
            }
        }

        lines.join("\n")
    }
}

impl Default for BatchRun {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SourceKey {
        SourceKey::new(s)
    }

    #[test]
    fn test_record_keeps_totals_consistent() {
        let mut run = BatchRun::start();
        run.record(ItemReport::accepted(key("a"), 120));
        run.record(ItemReport::skipped(key("b")));
        run.record(ItemReport::failed(key("c"), FailureStage::Validation, "missing", false, 80));
        run.record(ItemReport::failed(key("d"), FailureStage::Conflict, "exists", false, 90));

        assert_eq!(run.attempted, 4);
        assert_eq!(run.accepted + run.failed + run.skipped, run.attempted);
        assert_eq!(run.conflicts, 1);
        assert_eq!(run.tokens_used, 290);
        assert_eq!(run.failures.len(), 2);
    }

    #[test]
    fn test_summary_mentions_cancellation() {
        let mut run = BatchRun::start();
        run.fetched = 5;
        run.record(ItemReport::accepted(key("a"), 10));
        run.cancelled = true;
        run.finish();

        let summary = run.summary();
        assert!(summary.contains("Batch Run Summary"));
        assert!(summary.contains("Cancelled: 4 item(s) not started"));
        assert!(run.duration().is_some());
    }

    #[test]
    fn test_failures_by_stage() {
        let mut run = BatchRun::start();
        run.record(ItemReport::failed(key("a"), FailureStage::Extraction, "timeout", true, 0));
        run.record(ItemReport::failed(key("b"), FailureStage::Extraction, "timeout", true, 0));
        run.record(ItemReport::failed(key("c"), FailureStage::Store, "locked", true, 0));

        let counts = run.failures_by_stage();
        assert_eq!(counts.get(&FailureStage::Extraction), Some(&2));
        assert_eq!(counts.get(&FailureStage::Store), Some(&1));
        assert!(run.summary().contains("extraction: 2"));
    }
}
