//! Prompt assembly for catalogue extraction

use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, InvalidInput};
use modelcat_domain::{EntityKind, ExtractionRequest, PromptSegment};
use modelcat_gatekeeper::{contract, schema_for};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Builds extraction requests from raw text
///
/// Instructional segments are rendered once per entity kind at construction
/// time, so every request for a kind carries the same segments in the same
/// order with the same content hashes. Only the input text varies.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    config: ExtractorConfig,
    segments: HashMap<EntityKind, Vec<PromptSegment>>,
    schemas: HashMap<EntityKind, Value>,
}

impl PromptAssembler {
    /// Create an assembler, rendering the segments for every kind
    ///
    /// # Errors
    ///
    /// Returns `ExtractorError::Config` if the configuration is invalid.
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let shared = PromptSegment::new(SHARED_INSTRUCTIONS);
        let mut segments = HashMap::new();
        let mut schemas = HashMap::new();

        for kind in EntityKind::ALL {
            let mut kind_segments = vec![shared.clone(), PromptSegment::new(field_guide(kind))];
            if config.include_examples {
                kind_segments.push(PromptSegment::new(worked_example(kind)));
            }
            segments.insert(kind, kind_segments);
            schemas.insert(kind, schema_for(kind));
        }

        Ok(Self {
            config,
            segments,
            schemas,
        })
    }

    /// Instructional segments for a kind, in order
    pub fn segments(&self, kind: EntityKind) -> &[PromptSegment] {
        self.segments.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Assemble a request for `kind` from raw text
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty or too long text. No
    /// upstream call is made in that case.
    pub fn assemble(&self, kind: EntityKind, text: &str) -> Result<ExtractionRequest, InvalidInput> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InvalidInput::Empty);
        }

        let len = text.chars().count();
        if len > self.config.max_text_length {
            return Err(InvalidInput::TooLong(len, self.config.max_text_length));
        }

        let segments = self.segments(kind).to_vec();
        debug!(
            "Assembled {} request: {} segments, {} input chars",
            kind,
            segments.len(),
            len
        );

        let schema = self.schemas.get(&kind).cloned().unwrap_or(Value::Null);
        Ok(ExtractionRequest::new(kind, segments, text, schema))
    }
}

/// Render the field guide for a kind from its contract
fn field_guide(kind: EntityKind) -> String {
    let mut guide = format!(
        "Target record: {}\n\nFields (use null for anything the text does not state):\n",
        kind.as_str().replace('_', " ")
    );
    for field in contract(kind) {
        guide.push_str(&format!(
            "- {} ({}, {}): {}\n",
            field.name,
            field.field_type,
            if field.required { "required" } else { "optional" },
            field.description
        ));
    }
    guide
}

fn worked_example(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Model => MODEL_EXAMPLE,
        EntityKind::Benchmark => BENCHMARK_EXAMPLE,
        EntityKind::BenchmarkResult => BENCHMARK_RESULT_EXAMPLE,
        EntityKind::Opinion => OPINION_EXAMPLE,
    }
}

const SHARED_INSTRUCTIONS: &str = r#"You are a data extraction assistant for an AI model catalogue.

You extract structured records from unstructured sources such as research papers, technical blog posts, news articles and benchmark reports.

Guidelines:
- Only extract information explicitly stated in the text
- Use null for missing fields rather than guessing
- Normalize model names to lowercase with hyphens (gpt-4, not GPT4)
- Dates use YYYY-MM-DD; when only a month is given use the first day ("in March 2023" -> "2023-03-01")
- Keep descriptions concise (1-2 sentences)
- Put additional details (pricing, context window, capabilities) in metadata as a JSON object
- If the text contains no usable information for the target record, return null for every field"#;

const MODEL_EXAMPLE: &str = r#"Example
Text: "Anthropic released Claude 3 Opus in March 2024, its most capable model, with a 200K token context window."
Record: {"model_name": "claude-3-opus", "description": "Anthropic's most capable Claude 3 model.", "organization": "Anthropic", "release_date": "2024-03-01", "license": null, "metadata": {"context_window": 200000}}"#;

const BENCHMARK_EXAMPLE: &str = r#"Example
Text: "HumanEval measures functional correctness of code synthesized from docstrings (github.com/openai/human-eval)."
Record: {"name": "HumanEval", "category": "coding", "description": "Functional correctness of programs synthesized from docstrings.", "url": "https://github.com/openai/human-eval"}"#;

const BENCHMARK_RESULT_EXAMPLE: &str = r#"Example
Text: "In the technical report GPT-4 scored 86.4% on MMLU (5-shot)."
Record: {"model_name": "gpt-4", "benchmark_name": "MMLU", "score": 86.4, "date_tested": null, "source": "GPT-4 technical report"}"#;

const OPINION_EXAMPLE: &str = r#"Example
Text: "Writing for The Verge on 14 May 2024, Jane Doe called GPT-4o 'remarkably fast, if occasionally overconfident'."
Record: {"model_name": "gpt-4o", "content": "Remarkably fast, if occasionally overconfident.", "sentiment": "mixed", "source": "The Verge", "author": "Jane Doe", "date_published": "2024-05-14", "tags": ["speed", "reliability"]}"#;
