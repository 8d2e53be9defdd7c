//! Run-batch command implementation.

use super::{build_backend, build_pipeline};
use crate::cli::RunBatchArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use modelcat_domain::traits::{ExtractionBackend, FeedSource, LedgerStore, RecordStore};
use modelcat_ingest::{BatchRun, FeedConfig, FeedKind, IngestConfig, IngestionOrchestrator, Pipeline};
use modelcat_store::{MemoryLedger, MemoryRecordStore, SqliteLedger, SqliteRecordStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Execute the run-batch command.
///
/// Intended to be triggered by an external scheduler, e.g. a weekday
/// cron entry `0 9 * * 1-5`. Ctrl+C stops new items from starting and
/// lets in-flight items finish.
pub async fn execute_run_batch(
    args: RunBatchArgs,
    config: &Config,
    api_key: Option<&str>,
    formatter: &Formatter,
) -> Result<()> {
    let feed = feed_config(&args, config)?.build()?;
    let ingest = ingest_config(&args, config)?;
    let pipeline = Arc::new(build_pipeline(config, build_backend(config, api_key)?)?);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight items");
            on_signal.cancel();
        }
    });

    let run = if args.dry_run {
        info!("Dry run: records and ledger entries are kept in memory");
        run_with(
            pipeline,
            Arc::new(MemoryRecordStore::new()),
            Arc::new(MemoryLedger::new()),
            feed,
            ingest,
            cancel,
        )
        .await?
    } else {
        let path = &config.storage.database_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        run_with(
            pipeline,
            Arc::new(SqliteRecordStore::new(path)?),
            Arc::new(SqliteLedger::new(path)?),
            feed,
            ingest,
            cancel,
        )
        .await?
    };

    println!("{}", formatter.format_run(&run)?);
    Ok(())
}

async fn run_with<B, R, L, F>(
    pipeline: Arc<Pipeline<B>>,
    store: Arc<R>,
    ledger: Arc<L>,
    feed: F,
    config: IngestConfig,
    cancel: CancellationToken,
) -> Result<BatchRun>
where
    B: ExtractionBackend,
    R: RecordStore,
    L: LedgerStore,
    F: FeedSource,
{
    let orchestrator = IngestionOrchestrator::new(pipeline, store, ledger, feed, config)?;
    Ok(orchestrator.run_batch_with_cancel(cancel).await?)
}

/// Feed from command-line overrides, else from the config file.
fn feed_config(args: &RunBatchArgs, config: &Config) -> Result<FeedConfig> {
    let base = config.feed.clone().unwrap_or_default();
    if let Some(path) = &args.feed_file {
        return Ok(FeedConfig {
            kind: FeedKind::JsonFile,
            path: Some(path.clone()),
            ..base
        });
    }
    if let Some(url) = &args.feed_url {
        return Ok(FeedConfig {
            kind: FeedKind::Rss,
            url: Some(url.clone()),
            ..base
        });
    }
    config.feed.clone().ok_or_else(|| {
        CliError::Config("No feed configured: add a [feed] section or pass --feed-file/--feed-url".into())
    })
}

fn ingest_config(args: &RunBatchArgs, config: &Config) -> Result<IngestConfig> {
    let mut ingest = config.ingest.clone();
    if let Some(concurrency) = args.concurrency {
        ingest.max_concurrency = concurrency;
    }
    ingest.validate().map_err(CliError::Config)?;
    Ok(ingest)
}
