//! Source-key deduplication backed by the processing ledger

use crate::IngestError;
use modelcat_domain::traits::LedgerStore;
use modelcat_domain::{ProcessingOutcome, ProcessingRecord, RecordResult, SourceKey};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Decides whether a feed item still needs processing
///
/// The durable ledger answers across runs; an in-memory reservation set
/// answers within a run, so two workers never process the same key at once.
pub struct Deduplicator<L: LedgerStore> {
    ledger: Arc<L>,
    in_flight: Mutex<HashSet<SourceKey>>,
}

impl<L: LedgerStore> Deduplicator<L> {
    /// Create a deduplicator over a ledger
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            ledger,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The underlying ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Whether the key has neither been accepted nor is in flight
    ///
    /// A key whose latest outcome is rejected is eligible again.
    pub async fn should_process(&self, key: &SourceKey) -> Result<bool, IngestError> {
        if lock(&self.in_flight).contains(key) {
            return Ok(false);
        }
        let accepted = self
            .ledger
            .has_accepted(key)
            .await
            .map_err(|e| IngestError::Ledger(e.to_string()))?;
        Ok(!accepted)
    }

    /// Reserve the key for processing
    ///
    /// Returns `None` when the key is already accepted or reserved. The
    /// reservation is released when the returned guard is dropped.
    pub async fn begin(&self, key: &SourceKey) -> Result<Option<Reservation<'_, L>>, IngestError> {
        if !lock(&self.in_flight).insert(key.clone()) {
            debug!("{} already in flight", key);
            return Ok(None);
        }
        let reservation = Reservation {
            owner: self,
            key: key.clone(),
        };

        let accepted = self
            .ledger
            .has_accepted(key)
            .await
            .map_err(|e| IngestError::Ledger(e.to_string()))?;
        if accepted {
            debug!("{} already accepted", key);
            return Ok(None);
        }
        Ok(Some(reservation))
    }

    /// Append an outcome for the key
    pub async fn record(
        &self,
        key: &SourceKey,
        outcome: ProcessingOutcome,
        detail: Option<String>,
    ) -> Result<RecordResult, IngestError> {
        let mut record = ProcessingRecord::now(key.clone(), outcome);
        record.detail = detail;
        self.ledger
            .append(record)
            .await
            .map_err(|e| IngestError::Ledger(e.to_string()))
    }

    /// Number of keys currently reserved
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    fn release(&self, key: &SourceKey) {
        lock(&self.in_flight).remove(key);
    }
}

/// Exclusive claim on a source key for the duration of one item
pub struct Reservation<'a, L: LedgerStore> {
    owner: &'a Deduplicator<L>,
    key: SourceKey,
}

impl<L: LedgerStore> Reservation<'_, L> {
    /// Reserved key
    pub fn key(&self) -> &SourceKey {
        &self.key
    }
}

impl<L: LedgerStore> Drop for Reservation<'_, L> {
    fn drop(&mut self) {
        self.owner.release(&self.key);
    }
}
