//! Anthropic Messages API backend
//!
//! Sends one extraction attempt to the Messages API and maps the result onto
//! the pipeline's failure taxonomy.
//!
//! # Features
//!
//! - Instructional context sent as system blocks marked for prompt caching
//! - Structured output obtained by forcing a single tool call whose input
//!   schema is the target entity's field contract
//! - HTTP status classification into retryable and permanent categories
//!
//! # Examples
//!
//! ```no_run
//! use modelcat_llm::AnthropicBackend;
//!
//! let backend = AnthropicBackend::new("sk-ant-...", "claude-sonnet-4-5").unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use modelcat_domain::traits::ExtractionBackend;
use modelcat_domain::{
    ContextMode, ErrorCategory, TokenUsage, UpstreamCall, UpstreamError, UpstreamResponse,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// Default extraction model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default generation budget per call
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Transport-level timeout; the extraction client applies a tighter per-attempt timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Anthropic Messages API backend
pub struct AnthropicBackend {
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: TokenUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    ToolUse { name: String, input: Value },
    Text {
        #[allow(dead_code)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicBackend {
    /// Create a backend for the given API key and model
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the API key is empty.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config(
                "Anthropic API key not configured. Set ANTHROPIC_API_KEY".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key,
            max_tokens: DEFAULT_MAX_TOKENS,
            client,
        })
    }

    /// Override the API endpoint (proxies, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the generation budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build the Messages API request body for a call
    fn request_body(&self, call: &UpstreamCall) -> Value {
        // Every block carries a cache breakpoint; the API caches the prefix up
        // to each one and reads it back on the next call inside the window.
        // Registered and reused blocks are therefore sent identically; the
        // mode only feeds the cache summary logged in `extract`.
        let system: Vec<Value> = call
            .context
            .iter()
            .map(|block| {
                json!({
                    "type": "text",
                    "text": &*block.text,
                    "cache_control": {"type": "ephemeral"},
                })
            })
            .collect();

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "tools": [{
                "name": call.tool_name,
                "description": format!(
                    "Record the {} information extracted from the text. Use null for anything not stated.",
                    call.kind.as_str().replace('_', " ")
                ),
                "input_schema": call.schema,
            }],
            "tool_choice": {"type": "tool", "name": call.tool_name},
            "messages": [{
                "role": "user",
                "content": format!(
                    "Extract {} information from this text:\n\n{}",
                    call.kind.as_str().replace('_', " "),
                    call.input_text
                ),
            }],
        })
    }

    fn parse_response(call: &UpstreamCall, body: MessagesResponse) -> Result<UpstreamResponse, UpstreamError> {
        let input = body
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { name, input } if name == call.tool_name => Some(input),
                _ => None,
            })
            .ok_or_else(|| {
                UpstreamError::new(
                    ErrorCategory::InvalidResponse,
                    format!("response contained no '{}' tool call", call.tool_name),
                )
            })?;

        match input {
            Value::Object(fields) => Ok(UpstreamResponse {
                fields,
                usage: body.usage,
                model: body.model,
            }),
            other => Err(UpstreamError::new(
                ErrorCategory::InvalidResponse,
                format!("tool input is not an object: {}", other),
            )),
        }
    }
}

/// Map an HTTP status onto the failure taxonomy
pub fn classify_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        400 | 413 | 422 => ErrorCategory::BadRequest,
        401 | 403 => ErrorCategory::Unauthorized,
        404 => ErrorCategory::NotFound,
        408 => ErrorCategory::Timeout,
        // 529 is the API's "overloaded" status
        500..=599 => ErrorCategory::ServerError,
        _ => ErrorCategory::InvalidResponse,
    }
}

/// Map a transport error onto the failure taxonomy
fn classify_transport(err: &reqwest::Error) -> ErrorCategory {
    if err.is_timeout() {
        ErrorCategory::Timeout
    } else if err.is_decode() {
        ErrorCategory::InvalidResponse
    } else {
        ErrorCategory::Connection
    }
}

#[async_trait]
impl ExtractionBackend for AnthropicBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn extract(&self, call: &UpstreamCall) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}/v1/messages", self.endpoint);
        let body = self.request_body(call);
        let expected_reuse = reused_blocks(call);

        debug!(
            "POST {} ({} context blocks, {} expected cached, {} input chars)",
            url,
            call.context.len(),
            expected_reuse,
            call.input_text.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::new(classify_transport(&e), format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => format!("HTTP {} {}: {}", status, envelope.error.kind, envelope.error.message),
                Err(_) => format!("HTTP {}: {}", status, text),
            };
            return Err(UpstreamError::new(classify_status(status), message));
        }

        let parsed = response.json::<MessagesResponse>().await.map_err(|e| {
            UpstreamError::new(
                ErrorCategory::InvalidResponse,
                format!("Failed to parse response: {}", e),
            )
        })?;

        let result = Self::parse_response(call, parsed)?;
        if expected_reuse > 0 && result.usage.cache_read_input_tokens == 0 {
            debug!(
                "Expected {} cached context block(s) but upstream read none from cache",
                expected_reuse
            );
        }
        Ok(result)
    }
}

/// Number of context blocks the caller expects the upstream to serve from cache
fn reused_blocks(call: &UpstreamCall) -> usize {
    call.context
        .iter()
        .filter(|block| block.mode == ContextMode::Reuse)
        .count()
}
