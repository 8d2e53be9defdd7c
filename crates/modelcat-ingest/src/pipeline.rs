//! Single-input extraction path: assemble, extract, validate

use crate::IngestError;
use modelcat_domain::traits::ExtractionBackend;
use modelcat_domain::{
    EntityKind, ExtractionOutcome, ExtractionRequest, ExtractionSuccess, ValidatedEntity,
};
use modelcat_extractor::{ExtractionClient, PromptAssembler};
use modelcat_gatekeeper::ResponseValidator;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Assembles a request, runs it upstream and validates the answer
///
/// Used directly for manual submissions and stage by stage by the
/// orchestrator for feed items.
pub struct Pipeline<B: ExtractionBackend> {
    assembler: PromptAssembler,
    client: ExtractionClient<B>,
    validator: ResponseValidator,
    default_kind: EntityKind,
}

impl<B: ExtractionBackend> Pipeline<B> {
    /// Create a pipeline from its stages
    pub fn new(
        assembler: PromptAssembler,
        client: ExtractionClient<B>,
        validator: ResponseValidator,
        default_kind: EntityKind,
    ) -> Self {
        Self {
            assembler,
            client,
            validator,
            default_kind,
        }
    }

    /// Kind used by [`Pipeline::submit`]
    pub fn default_kind(&self) -> EntityKind {
        self.default_kind
    }

    /// The extraction client
    pub fn client(&self) -> &ExtractionClient<B> {
        &self.client
    }

    /// Extract and validate a default-kind entity from free text
    pub async fn submit(&self, text: &str) -> Result<ValidatedEntity, IngestError> {
        self.submit_as(self.default_kind, text).await
    }

    /// Extract and validate an entity of `kind` from free text
    ///
    /// Nothing is persisted; the caller decides what to do with the entity.
    pub async fn submit_as(&self, kind: EntityKind, text: &str) -> Result<ValidatedEntity, IngestError> {
        let request = self.prepare(kind, text)?;
        let success = self.extract(&request).await?;
        let entity = self.validate(kind, &success.fields)?;
        info!(
            "Submitted {} '{}' ({} tokens, {} attempt(s))",
            kind,
            entity.draft.natural_key(),
            success.tokens_used,
            success.attempts
        );
        Ok(entity)
    }

    /// Check the input and build the request
    pub fn prepare(&self, kind: EntityKind, text: &str) -> Result<ExtractionRequest, IngestError> {
        let request = self.assembler.assemble(kind, text)?;
        debug!("Assembled {} request ({} chars)", kind, request.input_text().len());
        Ok(request)
    }

    /// Run the request upstream, with retries
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionSuccess, IngestError> {
        match self.client.extract(request).await {
            ExtractionOutcome::Success(success) => Ok(success),
            ExtractionOutcome::Failure(failure) => {
                warn!(
                    "Extraction of {} failed after {} attempt(s): {}",
                    request.kind(),
                    failure.attempts,
                    failure.message
                );
                Err(failure.into())
            }
        }
    }

    /// Validate an upstream field map
    pub fn validate(&self, kind: EntityKind, fields: &Map<String, Value>) -> Result<ValidatedEntity, IngestError> {
        self.validator.validate(kind, fields).map_err(IngestError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelcat_domain::{Confidence, EntityDraft, ErrorCategory};
    use modelcat_extractor::{ClientConfig, ExtractorConfig, ReusableContextCache};
    use modelcat_gatekeeper::{RejectionReason, ValidationConfig};
    use modelcat_llm::MockBackend;
    use serde_json::json;
    use std::sync::Arc;

    const TEXT: &str = "OpenAI released GPT-4 on March 14, 2023, a large multimodal model.";

    fn pipeline(backend: MockBackend) -> Pipeline<MockBackend> {
        let client = ExtractionClient::new(
            Arc::new(backend),
            Arc::new(ReusableContextCache::default()),
            ClientConfig::default(),
        )
        .unwrap();
        Pipeline::new(
            PromptAssembler::new(ExtractorConfig::default()).unwrap(),
            client,
            ResponseValidator::new(ValidationConfig::default()),
            EntityKind::Model,
        )
    }

    #[tokio::test]
    async fn test_submit_complete_model() {
        let backend = MockBackend::new(json!({
            "model_name": "GPT-4",
            "description": "Large multimodal model",
            "organization": "OpenAI",
            "release_date": "2023-03-14",
            "license": "Proprietary",
            "metadata": {"modality": "text+image"}
        }));
        let entity = pipeline(backend).submit(TEXT).await.unwrap();

        assert_eq!(entity.confidence, Confidence::Complete);
        let EntityDraft::Model(model) = entity.draft else {
            panic!("expected a model draft");
        };
        assert_eq!(model.name, "gpt-4");
        assert_eq!(model.organization.as_deref(), Some("OpenAI"));
    }

    #[tokio::test]
    async fn test_submit_missing_required_is_rejected() {
        let backend = MockBackend::new(json!({"model_name": "GPT-4"}));
        let err = pipeline(backend).submit(TEXT).await.unwrap_err();

        let IngestError::Rejected(reasons) = err else {
            panic!("expected a rejection, got {err:?}");
        };
        assert!(reasons.contains(&RejectionReason::Missing {
            field: "description".to_string()
        }));
    }

    #[tokio::test]
    async fn test_short_input_is_extracted() {
        let backend = MockBackend::new(json!({
            "model_name": "GPT-5",
            "description": "New flagship model"
        }));
        let pipeline = pipeline(backend.clone());

        let entity = pipeline.submit("GPT-5 out").await.unwrap();
        assert_eq!(entity.confidence, Confidence::Partial);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_never_reaches_upstream() {
        let backend = MockBackend::default();
        let pipeline = pipeline(backend.clone());

        let err = pipeline.submit("   \n ").await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_request_surfaces_as_not_retryable() {
        let backend = MockBackend::failing(ErrorCategory::BadRequest, "schema rejected");
        let err = pipeline(backend).submit(TEXT).await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::Extraction {
                kind: ErrorCategory::BadRequest,
                retryable: false,
                attempts: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_submit_as_benchmark() {
        let backend = MockBackend::default();
        backend.push_fields(json!({
            "name": "MMLU",
            "description": "Massive multitask language understanding",
            "category": "knowledge",
            "url": null
        }));

        let entity = pipeline(backend)
            .submit_as(EntityKind::Benchmark, "MMLU measures knowledge across 57 subjects.")
            .await
            .unwrap();
        assert_eq!(entity.kind(), EntityKind::Benchmark);
        assert_eq!(entity.confidence, Confidence::Partial);
    }
}
