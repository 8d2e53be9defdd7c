//! Catalogue record store implementations

use crate::{open_connection, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use modelcat_domain::traits::{CreateOutcome, RecordStore};
use modelcat_domain::{Confidence, EntityDraft, EntityKind, RecordId, ValidatedEntity};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Model => "models",
        EntityKind::Benchmark => "benchmarks",
        EntityKind::BenchmarkResult => "benchmark_results",
        EntityKind::Opinion => "opinions",
    }
}

fn confidence_str(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::Complete => "complete",
        Confidence::Partial => "partial",
    }
}

fn conflict_detail(kind: EntityKind, key: &str) -> String {
    format!("{} '{}' already exists", kind, key)
}

/// SQLite-backed catalogue store
///
/// Uniqueness is enforced on each table's natural key; an insert that
/// collides writes nothing and reports a conflict.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) a store at the given path
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use modelcat_store::SqliteRecordStore;
    ///
    /// let store = SqliteRecordStore::new("modelcat.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_connection(path)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Convert RecordId to bytes for storage
    fn id_to_bytes(id: RecordId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to RecordId
    fn bytes_to_id(bytes: &[u8]) -> Result<RecordId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!("Expected 16 bytes for RecordId, got {}", bytes.len()))
        })?;
        Ok(RecordId::from_value(u128::from_be_bytes(arr)))
    }

    /// Number of records of a kind
    pub fn count(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table_for(kind)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn insert(conn: &Connection, id: &[u8], entity: &ValidatedEntity) -> Result<usize, StoreError> {
        let key = entity.draft.natural_key();
        let confidence = confidence_str(entity.confidence);
        let created_at = Utc::now().to_rfc3339();

        let inserted = match &entity.draft {
            EntityDraft::Model(m) => conn.execute(
                "INSERT INTO models (id, natural_key, model_name, description, organization, release_date, license, metadata, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(natural_key) DO NOTHING",
                params![
                    id,
                    key,
                    m.name,
                    m.description,
                    m.organization,
                    m.release_date.map(|d| d.to_string()),
                    m.license,
                    m.metadata.as_ref().map(serde_json::to_string).transpose()?,
                    confidence,
                    created_at,
                ],
            )?,
            EntityDraft::Benchmark(b) => conn.execute(
                "INSERT INTO benchmarks (id, natural_key, name, category, description, url, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(natural_key) DO NOTHING",
                params![id, key, b.name, b.category, b.description, b.url, confidence, created_at],
            )?,
            EntityDraft::BenchmarkResult(r) => conn.execute(
                "INSERT INTO benchmark_results (id, natural_key, model_name, benchmark_name, score, date_tested, source, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(natural_key) DO NOTHING",
                params![
                    id,
                    key,
                    r.model_name,
                    r.benchmark_name,
                    r.score,
                    r.date_tested.map(|d| d.to_string()),
                    r.source,
                    confidence,
                    created_at,
                ],
            )?,
            EntityDraft::Opinion(o) => conn.execute(
                "INSERT INTO opinions (id, natural_key, model_name, content, sentiment, source, author, date_published, tags, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(natural_key) DO NOTHING",
                params![
                    id,
                    key,
                    o.model_name,
                    o.content,
                    o.sentiment,
                    o.source,
                    o.author,
                    o.date_published.map(|d| d.to_string()),
                    o.tags.as_ref().map(serde_json::to_string).transpose()?,
                    confidence,
                    created_at,
                ],
            )?,
        };
        Ok(inserted)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    type Error = StoreError;

    async fn create(&self, entity: &ValidatedEntity) -> Result<CreateOutcome, Self::Error> {
        let id = RecordId::new();
        let conn = self.conn()?;
        let inserted = Self::insert(&conn, &Self::id_to_bytes(id), entity)?;

        if inserted == 0 {
            let key = entity.draft.natural_key();
            debug!("Conflict inserting {} '{}'", entity.kind(), key);
            return Ok(CreateOutcome::Conflict(conflict_detail(entity.kind(), &key)));
        }
        Ok(CreateOutcome::Created(id))
    }

    async fn find_by_key(&self, kind: EntityKind, key: &str) -> Result<Option<RecordId>, Self::Error> {
        let conn = self.conn()?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE natural_key = ?1", table_for(kind)),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        bytes.map(|b| Self::bytes_to_id(&b)).transpose()
    }
}

#[derive(Debug, Default)]
struct MemoryRecords {
    by_key: HashMap<(EntityKind, String), (RecordId, ValidatedEntity)>,
    failing_keys: HashSet<String>,
}

/// In-memory catalogue store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryRecords>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, MemoryRecords>, StoreError> {
        self.inner.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Make every create for this natural key fail with `Unavailable`
    pub fn fail_on(&self, natural_key: impl Into<String>) -> Result<(), StoreError> {
        self.inner()?.failing_keys.insert(natural_key.into());
        Ok(())
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.inner().map(|inner| inner.by_key.len()).unwrap_or(0)
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored entity for a kind and natural key
    pub fn get(&self, kind: EntityKind, key: &str) -> Option<ValidatedEntity> {
        self.inner()
            .ok()?
            .by_key
            .get(&(kind, key.to_string()))
            .map(|(_, entity)| entity.clone())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    type Error = StoreError;

    async fn create(&self, entity: &ValidatedEntity) -> Result<CreateOutcome, Self::Error> {
        let mut inner = self.inner()?;
        let key = entity.draft.natural_key();
        if inner.failing_keys.contains(&key) {
            return Err(StoreError::Unavailable(format!("write refused for '{}'", key)));
        }

        let slot = (entity.kind(), key);
        if inner.by_key.contains_key(&slot) {
            return Ok(CreateOutcome::Conflict(conflict_detail(slot.0, &slot.1)));
        }

        let id = RecordId::new();
        inner.by_key.insert(slot, (id, entity.clone()));
        Ok(CreateOutcome::Created(id))
    }

    async fn find_by_key(&self, kind: EntityKind, key: &str) -> Result<Option<RecordId>, Self::Error> {
        Ok(self
            .inner()?
            .by_key
            .get(&(kind, key.to_string()))
            .map(|(id, _)| *id))
    }
}
