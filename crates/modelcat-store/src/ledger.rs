//! Deduplication ledger implementations

use crate::{open_connection, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelcat_domain::traits::LedgerStore;
use modelcat_domain::{ProcessingOutcome, ProcessingRecord, RecordResult, SourceKey};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Per-outcome entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    /// Accepted entries (one per key at most)
    pub accepted: u64,

    /// Rejected entries
    pub rejected: u64,

    /// Skipped-duplicate entries
    pub skipped_duplicate: u64,
}

/// SQLite-backed ledger
///
/// The partial unique index on accepted rows makes the conditional append
/// atomic across connections and processes.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use modelcat_store::SqliteLedger;
    ///
    /// let ledger = SqliteLedger::new("modelcat.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_connection(path)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ProcessingRecord> {
        let outcome: String = row.get(1)?;
        let recorded_at: String = row.get(2)?;
        Ok(ProcessingRecord {
            source_key: SourceKey::new(row.get::<_, String>(0)?),
            outcome: ProcessingOutcome::parse(&outcome).ok_or_else(|| {
                conversion_error(1, StoreError::InvalidData(format!("Unknown outcome: {}", outcome)))
            })?,
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(2, StoreError::InvalidData(e.to_string())))?,
            detail: row.get(3)?,
        })
    }

    /// Most recent entries across all keys, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ProcessingRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_key, outcome, recorded_at, detail
             FROM processing_ledger ORDER BY id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Entry counts per outcome
    pub fn counts(&self) -> Result<LedgerCounts, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT outcome, COUNT(*) FROM processing_ledger GROUP BY outcome")?;
        let mut counts = LedgerCounts::default();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (outcome, count) = row?;
            match ProcessingOutcome::parse(&outcome) {
                Some(ProcessingOutcome::Accepted) => counts.accepted = count as u64,
                Some(ProcessingOutcome::Rejected) => counts.rejected = count as u64,
                Some(ProcessingOutcome::SkippedDuplicate) => counts.skipped_duplicate = count as u64,
                None => return Err(StoreError::InvalidData(format!("Unknown outcome: {}", outcome))),
            }
        }
        Ok(counts)
    }
}

fn conversion_error(column: usize, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    type Error = StoreError;

    async fn has_accepted(&self, key: &SourceKey) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM processing_ledger WHERE source_key = ?1 AND outcome = 'accepted')",
            params![key.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn latest(&self, key: &SourceKey) -> Result<Option<ProcessingRecord>, Self::Error> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT source_key, outcome, recorded_at, detail
                 FROM processing_ledger WHERE source_key = ?1 ORDER BY id DESC LIMIT 1",
                params![key.as_str()],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    async fn history(&self, key: &SourceKey) -> Result<Vec<ProcessingRecord>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_key, outcome, recorded_at, detail
             FROM processing_ledger WHERE source_key = ?1 ORDER BY id ASC",
        )?;
        let records = stmt
            .query_map(params![key.as_str()], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn append(&self, record: ProcessingRecord) -> Result<RecordResult, Self::Error> {
        let conn = self.conn()?;
        // DO NOTHING only ever fires on the partial index, i.e. a second acceptance
        let inserted = conn.execute(
            "INSERT INTO processing_ledger (source_key, outcome, recorded_at, detail)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT DO NOTHING",
            params![
                record.source_key.as_str(),
                record.outcome.as_str(),
                record.recorded_at.to_rfc3339(),
                record.detail,
            ],
        )?;

        if inserted == 0 {
            debug!("Ledger already holds an acceptance for {}", record.source_key);
            return Ok(RecordResult::AlreadyAccepted);
        }
        Ok(RecordResult::Recorded)
    }
}

/// In-memory ledger for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<ProcessingRecord>>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, Vec<ProcessingRecord>>, StoreError> {
        self.entries.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Every entry, oldest first
    pub fn all(&self) -> Result<Vec<ProcessingRecord>, StoreError> {
        Ok(self.entries()?.clone())
    }

    /// Number of accepted entries for a key
    pub fn accepted_count(&self, key: &SourceKey) -> Result<usize, StoreError> {
        Ok(self
            .entries()?
            .iter()
            .filter(|r| &r.source_key == key && r.outcome == ProcessingOutcome::Accepted)
            .count())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Error = StoreError;

    async fn has_accepted(&self, key: &SourceKey) -> Result<bool, Self::Error> {
        Ok(self.accepted_count(key)? > 0)
    }

    async fn latest(&self, key: &SourceKey) -> Result<Option<ProcessingRecord>, Self::Error> {
        Ok(self
            .entries()?
            .iter()
            .rev()
            .find(|r| &r.source_key == key)
            .cloned())
    }

    async fn history(&self, key: &SourceKey) -> Result<Vec<ProcessingRecord>, Self::Error> {
        Ok(self
            .entries()?
            .iter()
            .filter(|r| &r.source_key == key)
            .cloned()
            .collect())
    }

    async fn append(&self, record: ProcessingRecord) -> Result<RecordResult, Self::Error> {
        let mut entries = self.entries()?;
        if record.outcome == ProcessingOutcome::Accepted
            && entries
                .iter()
                .any(|r| r.source_key == record.source_key && r.outcome == ProcessingOutcome::Accepted)
        {
            return Ok(RecordResult::AlreadyAccepted);
        }
        entries.push(record);
        Ok(RecordResult::Recorded)
    }
}
