//! Modelcat Extractor
//!
//! Turns raw text into an upstream extraction call and drives that call to a
//! typed outcome.
//!
//! # Architecture
//!
//! ```text
//! Text → PromptAssembler → ExtractionRequest → ExtractionClient → ExtractionOutcome
//!                                                   ↕
//!                                          ReusableContextCache
//! ```
//!
//! # Key Features
//!
//! - **Deterministic prompts**: the instructional segments for an entity kind
//!   never change, so their content hashes are stable across calls
//! - **Reusable context**: segments registered upstream within the reuse
//!   window are marked for reuse instead of re-registration
//! - **Retry state machine**: transient upstream failures are retried with
//!   capped exponential backoff under a per-attempt timeout
//!
//! # Example Usage
//!
//! ```no_run
//! use modelcat_domain::{EntityKind, ExtractionOutcome};
//! use modelcat_extractor::{
//!     CacheConfig, ClientConfig, ExtractionClient, ExtractorConfig, PromptAssembler,
//!     ReusableContextCache,
//! };
//! use modelcat_llm::MockBackend;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let assembler = PromptAssembler::new(ExtractorConfig::default())?;
//! let cache = Arc::new(ReusableContextCache::new(&CacheConfig::default()));
//! let backend = Arc::new(MockBackend::new(json!({"model_name": "gpt-4"})));
//! let client = ExtractionClient::new(backend, cache, ClientConfig::default())?;
//!
//! let request = assembler.assemble(EntityKind::Model, "GPT-4 was released by OpenAI.")?;
//! match client.extract(&request).await {
//!     ExtractionOutcome::Success(s) => println!("{} tokens", s.tokens_used),
//!     ExtractionOutcome::Failure(f) => println!("failed: {}", f.message),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod config;
mod context_cache;
mod error;
mod prompt;

#[cfg(test)]
mod tests;

pub use client::{CallState, ExtractionClient};
pub use config::{CacheConfig, ClientConfig, ExtractorConfig};
pub use context_cache::{CacheStats, ReusableContextCache, Resolution, SegmentStatus};
pub use error::{ExtractorError, InvalidInput};
pub use prompt::PromptAssembler;
