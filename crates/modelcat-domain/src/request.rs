//! Extraction request and the upstream call boundary types

use crate::entity::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Hex-encoded SHA-256 of a prompt segment's text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash the given text
    ///
    /// # Examples
    ///
    /// ```
    /// use modelcat_domain::ContentHash;
    ///
    /// assert_eq!(ContentHash::of("abc"), ContentHash::of("abc"));
    /// assert_ne!(ContentHash::of("abc"), ContentHash::of("abd"));
    /// ```
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable piece of instructional context with a stable content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSegment {
    hash: ContentHash,
    text: Arc<str>,
}

impl PromptSegment {
    /// Create a segment, hashing its text
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        Self {
            hash: ContentHash::of(&text),
            text,
        }
    }

    /// Content hash of the text
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Segment text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }
}

/// A fully assembled extraction request
///
/// Immutable once built: the instructional segments are deterministic per
/// entity kind, the input text is the only variable part.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    kind: EntityKind,
    segments: Vec<PromptSegment>,
    input_text: String,
    schema: Value,
}

impl ExtractionRequest {
    /// Create a request from its parts
    pub fn new(
        kind: EntityKind,
        segments: Vec<PromptSegment>,
        input_text: impl Into<String>,
        schema: Value,
    ) -> Self {
        Self {
            kind,
            segments,
            input_text: input_text.into(),
            schema,
        }
    }

    /// Target entity kind
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Instructional context, in order
    pub fn segments(&self) -> &[PromptSegment] {
        &self.segments
    }

    /// Variable input text
    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    /// JSON schema describing the fields the upstream must return
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Build the upstream call, marking each segment for registration or reuse
    ///
    /// `is_registered` reports whether a segment hash is still registered
    /// with the upstream service.
    pub fn to_call<F>(&self, is_registered: F) -> UpstreamCall
    where
        F: Fn(&ContentHash) -> bool,
    {
        let context = self
            .segments
            .iter()
            .map(|segment| ContextBlock {
                hash: segment.hash().clone(),
                text: segment.shared_text(),
                mode: if is_registered(segment.hash()) {
                    ContextMode::Reuse
                } else {
                    ContextMode::Register
                },
            })
            .collect();

        UpstreamCall {
            kind: self.kind,
            context,
            input_text: self.input_text.clone(),
            tool_name: format!("record_{}", self.kind.as_str()),
            schema: self.schema.clone(),
        }
    }
}

/// How a context block should be treated by the upstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Send and register for later reuse
    Register,

    /// Previously registered and still inside the reuse window
    Reuse,
}

/// One instructional block of an upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    /// Content hash of the block
    pub hash: ContentHash,

    /// Block text
    pub text: Arc<str>,

    /// Register or reuse marker
    pub mode: ContextMode,
}

/// Payload handed to an [`ExtractionBackend`](crate::traits::ExtractionBackend)
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    /// Target entity kind
    pub kind: EntityKind,

    /// Instructional context blocks, in order
    pub context: Vec<ContextBlock>,

    /// Variable input text
    pub input_text: String,

    /// Name of the structured-output tool the upstream must fill in
    pub tool_name: String,

    /// JSON schema of the tool input
    pub schema: Value,
}

/// Token accounting reported by the upstream service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens billed at the normal rate
    pub input_tokens: u64,

    /// Generated tokens
    pub output_tokens: u64,

    /// Prompt tokens written to the upstream reuse cache
    #[serde(default)]
    pub cache_creation_input_tokens: u64,

    /// Prompt tokens served from the upstream reuse cache
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

impl TokenUsage {
    /// Input plus output tokens
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw result of a successful upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// Loosely typed field map, validated downstream
    pub fields: Map<String, Value>,

    /// Token accounting
    pub usage: TokenUsage,

    /// Upstream model identifier
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment_hash_is_stable() {
        let a = PromptSegment::new("instructions");
        let b = PromptSegment::new(String::from("instructions"));
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().as_str().len(), 64);
    }

    #[test]
    fn test_to_call_marks_registered_segments() {
        let first = PromptSegment::new("first");
        let second = PromptSegment::new("second");
        let registered = first.hash().clone();
        let request = ExtractionRequest::new(
            EntityKind::Model,
            vec![first, second],
            "GPT-4 was released in 2023",
            json!({"type": "object"}),
        );

        let call = request.to_call(|hash| *hash == registered);
        assert_eq!(call.context.len(), 2);
        assert_eq!(call.context[0].mode, ContextMode::Reuse);
        assert_eq!(call.context[1].mode, ContextMode::Register);
        assert_eq!(call.tool_name, "record_model");
        assert_eq!(call.input_text, "GPT-4 was released in 2023");
    }

    #[test]
    fn test_usage_total() {
        let usage = TokenUsage {
            input_tokens: 500,
            output_tokens: 150,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 900,
        };
        assert_eq!(usage.total(), 650);
    }
}
