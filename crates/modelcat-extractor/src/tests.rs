//! Integration tests for the extraction client

#[cfg(test)]
mod tests {
    use crate::{
        CacheConfig, ClientConfig, ExtractionClient, ExtractorConfig, PromptAssembler,
        ReusableContextCache, SegmentStatus,
    };
    use modelcat_domain::{ContextMode, EntityKind, ErrorCategory, ExtractionOutcome};
    use modelcat_llm::MockBackend;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const TEXT: &str = "OpenAI released GPT-4 in March 2023, a large multimodal model.";

    fn setup(backend: MockBackend) -> (PromptAssembler, ExtractionClient<MockBackend>, Arc<MockBackend>) {
        let assembler = PromptAssembler::new(ExtractorConfig::default()).unwrap();
        let cache = Arc::new(ReusableContextCache::new(&CacheConfig::default()));
        let backend = Arc::new(backend);
        let client =
            ExtractionClient::new(Arc::clone(&backend), cache, ClientConfig::default()).unwrap();
        (assembler, client, backend)
    }

    fn model_fields() -> serde_json::Value {
        json!({
            "model_name": "gpt-4",
            "description": "Large multimodal model",
            "organization": "OpenAI",
            "release_date": "2023-03-01"
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_two_rate_limits() {
        let mock = MockBackend::new(model_fields());
        mock.push_error(ErrorCategory::RateLimited, "429");
        mock.push_error(ErrorCategory::RateLimited, "429");
        let (assembler, client, backend) = setup(mock);

        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();
        match client.extract(&request).await {
            ExtractionOutcome::Success(success) => {
                assert_eq!(success.attempts, 3);
                assert_eq!(
                    success.delays,
                    vec![Duration::from_secs(1), Duration::from_secs(2)]
                );
                assert_eq!(success.fields["model_name"], "gpt-4");
                assert!(success.tokens_used > 0);
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_request_not_retried() {
        let mock = MockBackend::new(model_fields());
        mock.push_error(ErrorCategory::BadRequest, "invalid schema");
        let (assembler, client, backend) = setup(mock);

        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();
        match client.extract(&request).await {
            ExtractionOutcome::Failure(failure) => {
                assert_eq!(failure.attempts, 1);
                assert_eq!(failure.kind, ErrorCategory::BadRequest);
                assert!(!failure.retryable);
                assert!(failure.delays.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_transient_failure_is_retryable() {
        let (assembler, client, backend) =
            setup(MockBackend::failing(ErrorCategory::ServerError, "overloaded"));

        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();
        let outcome = client.extract(&request).await;
        match outcome {
            ExtractionOutcome::Failure(failure) => {
                assert_eq!(failure.attempts, 3);
                assert!(failure.retryable);
                assert_eq!(failure.kind, ErrorCategory::ServerError);
                assert_eq!(failure.message, "overloaded");
                assert_eq!(failure.delays.len(), 2);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried() {
        let mock = MockBackend::new(model_fields()).with_latency(Duration::from_secs(600));
        let (assembler, client, backend) = setup(mock);

        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();
        match client.extract(&request).await {
            ExtractionOutcome::Failure(failure) => {
                assert_eq!(failure.kind, ErrorCategory::Timeout);
                assert!(failure.retryable);
                assert_eq!(failure.attempts, 3);
            }
            other => panic!("expected timeout failure, got {:?}", other),
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_second_call_reuses_context() {
        let (assembler, client, backend) = setup(MockBackend::new(model_fields()));
        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();

        assert!(client.extract(&request).await.is_success());
        assert!(client.extract(&request).await.is_success());

        let calls = backend.calls();
        assert!(calls[0].context.iter().all(|b| b.mode == ContextMode::Register));
        assert!(calls[1].context.iter().all(|b| b.mode == ContextMode::Reuse));

        let stats = client.cache().stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.hits, 3);
    }

    #[tokio::test]
    async fn test_reuse_window_starts_when_request_is_sent() {
        let latency = Duration::from_millis(300);
        let window = Duration::from_secs(5);
        let assembler = PromptAssembler::new(ExtractorConfig::default()).unwrap();
        let cache = Arc::new(ReusableContextCache::new(&CacheConfig {
            reuse_window_secs: window.as_secs(),
            ..CacheConfig::default()
        }));
        let backend = Arc::new(MockBackend::new(model_fields()).with_latency(latency));
        let client =
            ExtractionClient::new(backend, Arc::clone(&cache), ClientConfig::default()).unwrap();
        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();

        let started = Instant::now();
        assert!(matches!(client.extract(&request).await, ExtractionOutcome::Success(_)));

        // Stamped at response time the segment would still look live here.
        let hash = request.segments()[0].hash();
        assert_eq!(
            cache.status_at(hash, started + window + latency),
            SegmentStatus::Expired
        );
        assert_eq!(cache.status_at(hash, started + window / 2), SegmentStatus::Registered);
    }

    #[tokio::test]
    async fn test_failed_call_does_not_register_context() {
        let (assembler, client, backend) =
            setup(MockBackend::failing(ErrorCategory::Unauthorized, "bad key"));
        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();

        assert!(!client.extract(&request).await.is_success());
        assert_eq!(backend.call_count(), 1);
        assert_eq!(client.cache().stats().entries, 0);
    }

    #[tokio::test]
    async fn test_kinds_share_instruction_segment() {
        let (assembler, client, backend) = setup(MockBackend::new(json!({"name": "MMLU"})));

        let model = assembler.assemble(EntityKind::Model, TEXT).unwrap();
        let bench = assembler
            .assemble(EntityKind::Benchmark, "MMLU covers 57 subjects")
            .unwrap();
        client.extract(&model).await;
        client.extract(&bench).await;

        let calls = backend.calls();
        assert_eq!(calls[1].context[0].mode, ContextMode::Reuse);
        assert_eq!(calls[1].context[1].mode, ContextMode::Register);
        assert_eq!(calls[1].tool_name, "record_benchmark");
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = ClientConfig {
            max_attempts: 0,
            ..ClientConfig::default()
        };
        let result = ExtractionClient::new(
            Arc::new(MockBackend::default()),
            Arc::new(ReusableContextCache::default()),
            config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_single_attempt_config_blocks_on_outcome() {
        let config = ClientConfig {
            max_attempts: 1,
            ..ClientConfig::default()
        };
        let backend = Arc::new(MockBackend::failing(ErrorCategory::RateLimited, "429"));
        let client = ExtractionClient::new(
            Arc::clone(&backend),
            Arc::new(ReusableContextCache::default()),
            config,
        )
        .unwrap();
        let assembler = PromptAssembler::new(ExtractorConfig::default()).unwrap();
        let request = assembler.assemble(EntityKind::Model, TEXT).unwrap();

        let outcome = tokio_test::block_on(client.extract(&request));
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(backend.call_count(), 1);
    }
}
