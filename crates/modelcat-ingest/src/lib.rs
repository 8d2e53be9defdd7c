//! Modelcat Ingest
//!
//! Ingestion service that turns free text into catalogue records.
//!
//! # Overview
//!
//! Two entry points share one extraction path:
//! - **Manual submission**: `submit` extracts and validates one input and
//!   hands the entity back without persisting it
//! - **Batch runs**: `run_batch` pulls pending items from a feed, skips
//!   anything already accepted, and writes records plus ledger entries
//!
//! # Architecture
//!
//! ```text
//! FeedSource ─▶ Deduplicator ─▶ PromptAssembler ─▶ ExtractionClient ─▶ ResponseValidator ─▶ RecordStore
//!                    │                                                                         │
//!                    └──────────────────────── processing ledger ◀─────────────────────────────┘
//! ```
//!
//! ## Item Lifecycle
//!
//! | State | Next | Ledger entry |
//! |-------|------|--------------|
//! | **Pending** | Skipped, Extracting | |
//! | **Skipped** | (final) | `skipped_duplicate` |
//! | **Extracting** | Validating, Rejected | |
//! | **Validating** | Accepted, Rejected | |
//! | **Accepted** | (final) | `accepted` with record id |
//! | **Rejected** | (final) | `rejected` with stage and reason |
//!
//! A rejected key is eligible again on the next run; an accepted key never is.
//!
//! # Usage
//!
//! ## Batch Run with Cancellation
//!
//! ```no_run
//! # use modelcat_domain::traits::{ExtractionBackend, FeedSource, LedgerStore, RecordStore};
//! # use modelcat_ingest::IngestionOrchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run<B, R, L, F>(orchestrator: IngestionOrchestrator<B, R, L, F>)
//! # where B: ExtractionBackend, R: RecordStore, L: LedgerStore, F: FeedSource {
//! let cancel = CancellationToken::new();
//! let on_signal = cancel.clone();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     on_signal.cancel();
//! });
//!
//! let run = orchestrator.run_batch_with_cancel(cancel).await;
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use modelcat_ingest::IngestConfig;
//!
//! // Default: four items at once, model extraction
//! let config = IngestConfig::default();
//!
//! // Aggressive: eight items at once
//! let config = IngestConfig::aggressive();
//!
//! // Lenient: two items at once, skips not written to the ledger
//! let config = IngestConfig::lenient();
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [ingest]
//! max_concurrency = 4
//! default_kind = "model"
//! record_skips = true
//!
//! [feed]
//! kind = "rss"
//! url = "https://example.com/feed.xml"
//! timeout_secs = 30
//! ```

#![warn(missing_docs)]

mod config;
mod dedup;
mod error;
mod feed;
mod orchestrator;
mod pipeline;
mod report;
mod state;

pub use config::IngestConfig;
pub use dedup::{Deduplicator, Reservation};
pub use error::{FeedError, IngestError};
pub use feed::{
    parse_feed_document, ConfiguredFeed, FeedConfig, FeedKind, JsonFileFeed, RssFeed, StaticFeed,
};
pub use orchestrator::IngestionOrchestrator;
pub use pipeline::Pipeline;
pub use report::{BatchRun, FailureStage, ItemDisposition, ItemFailure, ItemReport};
pub use state::{ItemProgress, ItemState};
