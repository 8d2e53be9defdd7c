//! Batch ingestion: feed → dedup → extract → validate → store → ledger

use crate::dedup::Deduplicator;
use crate::pipeline::Pipeline;
use crate::report::{BatchRun, FailureStage, ItemReport};
use crate::state::{ItemProgress, ItemState};
use crate::{IngestConfig, IngestError};
use futures::future;
use futures::stream::{self, StreamExt};
use modelcat_domain::traits::{CreateOutcome, ExtractionBackend, FeedSource, LedgerStore, RecordStore};
use modelcat_domain::{EntityKind, FeedItem, ProcessingOutcome, RecordResult, SourceKey, ValidatedEntity};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives feed items through the pipeline into the catalogue
///
/// Items are processed concurrently up to `max_concurrency`. Each item is
/// reserved by source key before work starts and its outcome is appended
/// to the ledger, so a rerun over the same feed only retries what failed.
///
/// # Examples
///
/// ```no_run
/// use modelcat_extractor::{ClientConfig, ExtractionClient, ExtractorConfig, PromptAssembler, ReusableContextCache};
/// use modelcat_gatekeeper::{ResponseValidator, ValidationConfig};
/// use modelcat_ingest::{IngestConfig, IngestionOrchestrator, JsonFileFeed, Pipeline};
/// use modelcat_llm::MockBackend;
/// use modelcat_store::{SqliteLedger, SqliteRecordStore};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ExtractionClient::new(
///     Arc::new(MockBackend::default()),
///     Arc::new(ReusableContextCache::default()),
///     ClientConfig::default(),
/// )?;
/// let config = IngestConfig::default();
/// let pipeline = Pipeline::new(
///     PromptAssembler::new(ExtractorConfig::default())?,
///     client,
///     ResponseValidator::new(ValidationConfig::default()),
///     config.default_kind,
/// );
///
/// let orchestrator = IngestionOrchestrator::new(
///     Arc::new(pipeline),
///     Arc::new(SqliteRecordStore::new("modelcat.db")?),
///     Arc::new(SqliteLedger::new("modelcat.db")?),
///     JsonFileFeed::new("feed.jsonl"),
///     config,
/// )?;
///
/// let run = orchestrator.run_batch().await?;
/// println!("{}", run.summary());
/// # Ok(())
/// # }
/// ```
pub struct IngestionOrchestrator<B, R, L, F>
where
    B: ExtractionBackend,
    R: RecordStore,
    L: LedgerStore,
    F: FeedSource,
{
    pipeline: Arc<Pipeline<B>>,
    store: Arc<R>,
    dedup: Deduplicator<L>,
    feed: F,
    config: IngestConfig,
}

impl<B, R, L, F> IngestionOrchestrator<B, R, L, F>
where
    B: ExtractionBackend,
    R: RecordStore,
    L: LedgerStore,
    F: FeedSource,
{
    /// Create an orchestrator
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Config` if the configuration is invalid.
    pub fn new(
        pipeline: Arc<Pipeline<B>>,
        store: Arc<R>,
        ledger: Arc<L>,
        feed: F,
        config: IngestConfig,
    ) -> Result<Self, IngestError> {
        config.validate().map_err(IngestError::Config)?;
        Ok(Self {
            pipeline,
            store,
            dedup: Deduplicator::new(ledger),
            feed,
            config,
        })
    }

    /// Current configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// The deduplicator and its ledger
    pub fn dedup(&self) -> &Deduplicator<L> {
        &self.dedup
    }

    /// Extract and validate a default-kind entity from free text
    ///
    /// Manual submissions bypass the feed, the ledger and the store.
    pub async fn submit(&self, text: &str) -> Result<ValidatedEntity, IngestError> {
        self.pipeline.submit(text).await
    }

    /// Extract and validate an entity of `kind` from free text
    pub async fn submit_as(&self, kind: EntityKind, text: &str) -> Result<ValidatedEntity, IngestError> {
        self.pipeline.submit_as(kind, text).await
    }

    /// Process every pending feed item once
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Feed` if the feed cannot be read. Per-item
    /// failures never abort the run; they are reported in the result.
    pub async fn run_batch(&self) -> Result<BatchRun, IngestError> {
        self.run_batch_with_cancel(CancellationToken::new()).await
    }

    /// Process pending feed items until done or cancelled
    ///
    /// After cancellation no further items are started; items already in
    /// flight run to completion and are recorded.
    pub async fn run_batch_with_cancel(&self, cancel: CancellationToken) -> Result<BatchRun, IngestError> {
        let mut run = BatchRun::start();

        let items = self
            .feed
            .fetch_pending()
            .await
            .map_err(|e| IngestError::Feed(e.to_string()))?;
        run.fetched = items.len();
        info!(
            "Batch started: {} item(s), concurrency {}",
            items.len(),
            self.config.max_concurrency
        );

        let reports: Vec<ItemReport> = stream::iter(items)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|item| self.process_item(item))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        for report in reports {
            run.record(report);
        }
        run.cancelled = cancel.is_cancelled();
        run.finish();

        if run.cancelled {
            warn!(
                "Batch cancelled: {} started, {} not started",
                run.attempted,
                run.not_started()
            );
        }
        info!(
            "Batch finished: {} accepted, {} skipped, {} failed, {} tokens",
            run.accepted, run.skipped, run.failed, run.tokens_used
        );
        Ok(run)
    }

    async fn process_item(&self, item: FeedItem) -> ItemReport {
        let FeedItem {
            source_key,
            raw_text,
            kind,
        } = item;
        let mut progress = ItemProgress::new(source_key.clone());

        let reservation = match self.dedup.begin(&source_key).await {
            Ok(Some(reservation)) => reservation,
            Ok(None) => {
                progress.move_to(ItemState::Skipped);
                self.record_skip(&source_key).await;
                return ItemReport::skipped(source_key);
            }
            Err(e) => {
                progress.move_to(ItemState::Rejected);
                warn!("{}: ledger check failed: {}", source_key, e);
                return ItemReport::failed(source_key, FailureStage::Ledger, e.to_string(), true, 0);
            }
        };

        let kind = kind.unwrap_or(self.config.default_kind);
        let report = self.run_stages(&mut progress, kind, &raw_text).await;
        drop(reservation);
        report
    }

    async fn run_stages(&self, progress: &mut ItemProgress, kind: EntityKind, text: &str) -> ItemReport {
        let key = progress.key().clone();

        progress.move_to(ItemState::Extracting);
        let request = match self.pipeline.prepare(kind, text) {
            Ok(request) => request,
            Err(e) => return self.reject(progress, FailureStage::Input, &e, 0).await,
        };
        let success = match self.pipeline.extract(&request).await {
            Ok(success) => success,
            Err(e) => return self.reject(progress, FailureStage::Extraction, &e, 0).await,
        };
        let tokens = success.tokens_used;

        progress.move_to(ItemState::Validating);
        let entity = match self.pipeline.validate(kind, &success.fields) {
            Ok(entity) => entity,
            Err(e) => return self.reject(progress, FailureStage::Validation, &e, tokens).await,
        };

        let record_id = match self.store.create(&entity).await {
            Ok(CreateOutcome::Created(id)) => id,
            Ok(CreateOutcome::Conflict(detail)) => {
                let e = IngestError::Store(format!("record already exists: {}", detail));
                return self.reject(progress, FailureStage::Conflict, &e, tokens).await;
            }
            Err(e) => {
                let e = IngestError::Store(e.to_string());
                return self.reject(progress, FailureStage::Store, &e, tokens).await;
            }
        };

        match self
            .dedup
            .record(&key, ProcessingOutcome::Accepted, Some(record_id.to_string()))
            .await
        {
            Ok(RecordResult::Recorded) => {
                progress.move_to(ItemState::Accepted);
                info!("{}: accepted as {} {}", key, kind, record_id);
                ItemReport::accepted(key, tokens)
            }
            Ok(RecordResult::AlreadyAccepted) => {
                progress.move_to(ItemState::Skipped);
                warn!("{}: accepted concurrently elsewhere, record {} is redundant", key, record_id);
                ItemReport {
                    tokens_used: tokens,
                    ..ItemReport::skipped(key)
                }
            }
            Err(e) => {
                // Later runs will hit a natural-key conflict for this key until
                // an accepted entry naming the record is appended by hand.
                progress.move_to(ItemState::Rejected);
                let natural_key = entity.draft.natural_key();
                error!(
                    source_key = %key,
                    record_id = %record_id,
                    kind = %kind,
                    natural_key = %natural_key,
                    "Record created but acceptance not recorded: {}",
                    e
                );
                let message = format!(
                    "record {} ({} {}) created but acceptance not recorded: {}",
                    record_id, kind, natural_key, e
                );
                ItemReport::failed(key, FailureStage::Ledger, message, false, tokens)
            }
        }
    }

    async fn reject(
        &self,
        progress: &mut ItemProgress,
        stage: FailureStage,
        error: &IngestError,
        tokens: u64,
    ) -> ItemReport {
        progress.move_to(ItemState::Rejected);
        let key = progress.key().clone();
        let message = error.to_string();
        warn!("{}: rejected at {}: {}", key, stage, message);

        let detail = format!("{}: {}", stage, message);
        if let Err(e) = self.dedup.record(&key, ProcessingOutcome::Rejected, Some(detail)).await {
            warn!("{}: could not record rejection: {}", key, e);
        }
        let retryable = stage != FailureStage::Conflict && error.is_retryable();
        ItemReport::failed(key, stage, message, retryable, tokens)
    }

    async fn record_skip(&self, key: &SourceKey) {
        debug!("{}: skipped duplicate", key);
        if !self.config.record_skips {
            return;
        }
        if let Err(e) = self.dedup.record(key, ProcessingOutcome::SkippedDuplicate, None).await {
            warn!("{}: could not record skip: {}", key, e);
        }
    }
}
