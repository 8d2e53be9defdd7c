//! Modelcat Extraction Backends
//!
//! Implementations of the `ExtractionBackend` trait from `modelcat-domain`.
//!
//! # Backends
//!
//! - `MockBackend`: Scripted, deterministic backend for tests and dry runs
//! - `AnthropicBackend`: Anthropic Messages API with prompt caching and
//!   tool-forced structured output
//!
//! Each call to a backend is a single attempt. Retry and backoff live in
//! `modelcat-extractor`.
//!
//! # Examples
//!
//! ```
//! use modelcat_llm::MockBackend;
//! use serde_json::json;
//!
//! let backend = MockBackend::new(json!({"model_name": "gpt-4"}));
//! assert_eq!(backend.call_count(), 0);
//! ```

#![warn(missing_docs)]

pub mod anthropic;

use async_trait::async_trait;
use modelcat_domain::traits::ExtractionBackend;
use modelcat_domain::{
    ContextMode, ErrorCategory, TokenUsage, UpstreamCall, UpstreamError, UpstreamResponse,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicBackend;

/// Errors that can occur while setting up a backend
#[derive(Error, Debug)]
pub enum LlmError {
    /// Missing or invalid configuration (API key, endpoint)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Reply a [`MockBackend`] gives to one call
pub type MockReply = Result<Value, UpstreamError>;

/// Scripted extraction backend for deterministic testing
///
/// Replies are chosen in this order:
/// 1. a reply registered for the exact input text
/// 2. the next scripted reply, if any remain
/// 3. the default reply
///
/// Token usage is derived from text lengths (4 chars ≈ 1 token), with
/// reused context counted as cache reads.
///
/// # Examples
///
/// ```
/// use modelcat_llm::{IntoMockError, MockBackend};
/// use modelcat_domain::ErrorCategory;
/// use serde_json::json;
///
/// let backend = MockBackend::new(json!({"model_name": "gpt-4"}))
///     .with_model("mock-extractor");
/// backend.push_error(ErrorCategory::RateLimited, "slow down");
/// backend.respond_to("bad input", Err(ErrorCategory::BadRequest.into_mock("nope")));
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    model: String,
    default_reply: MockReply,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    by_text: Arc<Mutex<HashMap<String, MockReply>>>,
    calls: Arc<Mutex<Vec<UpstreamCall>>>,
    latency: Option<Duration>,
}

/// Convenience for building mock errors from a category
pub trait IntoMockError {
    /// Build an [`UpstreamError`] with this category
    fn into_mock(self, message: &str) -> UpstreamError;
}

impl IntoMockError for ErrorCategory {
    fn into_mock(self, message: &str) -> UpstreamError {
        UpstreamError::new(self, message)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    /// Create a backend that answers every call with the given field map
    pub fn new(fields: Value) -> Self {
        Self {
            model: "mock-extractor".to_string(),
            default_reply: Ok(fields),
            script: Arc::new(Mutex::new(VecDeque::new())),
            by_text: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// Create a backend whose default reply is an error
    pub fn failing(category: ErrorCategory, message: &str) -> Self {
        let mut backend = Self::new(Value::Null);
        backend.default_reply = Err(UpstreamError::new(category, message));
        backend
    }

    /// Set the reported model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep this long before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a successful reply
    pub fn push_fields(&self, fields: Value) {
        lock(&self.script).push_back(Ok(fields));
    }

    /// Queue a failed reply
    pub fn push_error(&self, category: ErrorCategory, message: &str) {
        lock(&self.script).push_back(Err(UpstreamError::new(category, message)));
    }

    /// Register a reply for an exact input text
    pub fn respond_to(&self, input_text: impl Into<String>, reply: MockReply) {
        lock(&self.by_text).insert(input_text.into(), reply);
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<UpstreamCall> {
        lock(&self.calls).clone()
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    fn next_reply(&self, input_text: &str) -> MockReply {
        if let Some(reply) = lock(&self.by_text).get(input_text) {
            return reply.clone();
        }
        if let Some(reply) = lock(&self.script).pop_front() {
            return reply;
        }
        self.default_reply.clone()
    }

    fn usage_for(call: &UpstreamCall) -> TokenUsage {
        let mut usage = TokenUsage {
            input_tokens: (call.input_text.len() / 4) as u64,
            output_tokens: 64,
            ..TokenUsage::default()
        };
        for block in &call.context {
            let tokens = (block.text.len() / 4) as u64;
            match block.mode {
                ContextMode::Register => usage.cache_creation_input_tokens += tokens,
                ContextMode::Reuse => usage.cache_read_input_tokens += tokens,
            }
        }
        usage
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn extract(&self, call: &UpstreamCall) -> Result<UpstreamResponse, UpstreamError> {
        lock(&self.calls).push(call.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.next_reply(&call.input_text)? {
            Value::Object(fields) => Ok(UpstreamResponse {
                fields,
                usage: Self::usage_for(call),
                model: self.model.clone(),
            }),
            other => Err(UpstreamError::new(
                ErrorCategory::InvalidResponse,
                format!("expected a JSON object, got {}", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelcat_domain::{EntityKind, ExtractionRequest, PromptSegment};
    use serde_json::json;

    fn call(text: &str) -> UpstreamCall {
        ExtractionRequest::new(
            EntityKind::Model,
            vec![PromptSegment::new("instructions for the model")],
            text,
            json!({"type": "object"}),
        )
        .to_call(|_| false)
    }

    #[tokio::test]
    async fn test_mock_default_reply() {
        let backend = MockBackend::new(json!({"model_name": "gpt-4"}));
        let response = backend.extract(&call("text")).await.unwrap();
        assert_eq!(response.fields["model_name"], "gpt-4");
        assert_eq!(response.model, "mock-extractor");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_script_then_default() {
        let backend = MockBackend::new(json!({"model_name": "default"}));
        backend.push_error(ErrorCategory::RateLimited, "slow down");
        backend.push_fields(json!({"model_name": "scripted"}));

        let first = backend.extract(&call("a")).await.unwrap_err();
        assert_eq!(first.category, ErrorCategory::RateLimited);

        let second = backend.extract(&call("a")).await.unwrap();
        assert_eq!(second.fields["model_name"], "scripted");

        let third = backend.extract(&call("a")).await.unwrap();
        assert_eq!(third.fields["model_name"], "default");
    }

    #[tokio::test]
    async fn test_mock_reply_by_text_wins() {
        let backend = MockBackend::new(json!({"model_name": "default"}));
        backend.respond_to("bad", Err(ErrorCategory::BadRequest.into_mock("nope")));
        backend.push_fields(json!({"model_name": "scripted"}));

        let err = backend.extract(&call("bad")).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::BadRequest);

        // Script untouched by the text-matched call
        let ok = backend.extract(&call("good")).await.unwrap();
        assert_eq!(ok.fields["model_name"], "scripted");
    }

    #[tokio::test]
    async fn test_mock_non_object_is_invalid_response() {
        let backend = MockBackend::new(json!(["not", "an", "object"]));
        let err = backend.extract(&call("text")).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::InvalidResponse);
    }

    #[tokio::test]
    async fn test_mock_usage_counts_reused_context_as_cache_reads() {
        let backend = MockBackend::default();
        let request = ExtractionRequest::new(
            EntityKind::Model,
            vec![PromptSegment::new("x".repeat(400))],
            "y".repeat(40),
            json!({}),
        );

        let fresh = backend.extract(&request.to_call(|_| false)).await.unwrap();
        assert_eq!(fresh.usage.cache_creation_input_tokens, 100);
        assert_eq!(fresh.usage.cache_read_input_tokens, 0);

        let reused = backend.extract(&request.to_call(|_| true)).await.unwrap();
        assert_eq!(reused.usage.cache_read_input_tokens, 100);
        assert_eq!(reused.usage.input_tokens, 10);
    }

    #[tokio::test]
    async fn test_mock_clone_shares_state() {
        let backend = MockBackend::default();
        let clone = backend.clone();
        clone.extract(&call("text")).await.unwrap();
        assert_eq!(backend.call_count(), 1);
        backend.reset_calls();
        assert_eq!(clone.call_count(), 0);
    }
}
