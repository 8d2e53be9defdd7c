//! Command implementations.

pub mod batch;
pub mod config;
pub mod ledger;
pub mod submit;

pub use self::batch::execute_run_batch;
pub use self::config::execute_config;
pub use self::ledger::execute_ledger;
pub use self::submit::execute_submit;

use crate::config::Config;
use crate::error::{CliError, Result};
use modelcat_domain::traits::ExtractionBackend;
use modelcat_extractor::{ExtractionClient, PromptAssembler, ReusableContextCache};
use modelcat_gatekeeper::ResponseValidator;
use modelcat_ingest::Pipeline;
use modelcat_llm::AnthropicBackend;
use std::sync::Arc;
use tracing::debug;

/// Build the upstream backend from configuration and the API key.
pub fn build_backend(config: &Config, api_key: Option<&str>) -> Result<AnthropicBackend> {
    let api_key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| CliError::Config("ANTHROPIC_API_KEY is not set (or pass --api-key)".into()))?;
    let backend = AnthropicBackend::new(api_key, config.upstream.model.clone())?
        .with_endpoint(config.upstream.endpoint.clone())
        .with_max_tokens(config.upstream.max_tokens);
    debug!("Using upstream model {}", config.upstream.model);
    Ok(backend)
}

/// Assemble the extraction pipeline around a backend.
pub fn build_pipeline<B: ExtractionBackend>(config: &Config, backend: B) -> Result<Pipeline<B>> {
    let cache = Arc::new(ReusableContextCache::new(&config.cache));
    let client = ExtractionClient::new(Arc::new(backend), cache, config.client.clone())?;
    let assembler = PromptAssembler::new(config.extractor.clone())?;
    Ok(Pipeline::new(
        assembler,
        client,
        ResponseValidator::new(config.validation.clone()),
        config.ingest.default_kind,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelcat_llm::MockBackend;

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        assert!(matches!(build_backend(&config, None), Err(CliError::Config(_))));
        assert!(matches!(build_backend(&config, Some("  ")), Err(CliError::Config(_))));
    }

    #[test]
    fn test_backend_from_config() {
        let config = Config::default();
        assert!(build_backend(&config, Some("sk-test")).is_ok());
    }

    #[test]
    fn test_pipeline_uses_configured_kind() {
        let mut config = Config::default();
        config.ingest.default_kind = modelcat_domain::EntityKind::Opinion;
        let pipeline = build_pipeline(&config, MockBackend::default()).unwrap();
        assert_eq!(pipeline.default_kind(), modelcat_domain::EntityKind::Opinion);
    }
}
