//! Catalogue entities - the typed drafts produced by a successful extraction

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier assigned by a record store to a persisted entity
///
/// Backed by a UUIDv7 so identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u128);

impl RecordId {
    /// Generate a new UUIDv7-based RecordId
    ///
    /// # Examples
    ///
    /// ```
    /// use modelcat_domain::RecordId;
    ///
    /// let id = RecordId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a RecordId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a RecordId from its hyphenated string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid record id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for RecordId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which catalogue entity an extraction targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An AI model (gpt-4, claude-3-sonnet, ...)
    Model,

    /// An evaluation benchmark (MMLU, HumanEval, ...)
    Benchmark,

    /// A model's score on a benchmark
    BenchmarkResult,

    /// Published opinion about a model
    Opinion,
}

impl EntityKind {
    /// All kinds, in catalogue order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Model,
        EntityKind::Benchmark,
        EntityKind::BenchmarkResult,
        EntityKind::Opinion,
    ];

    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Model => "model",
            EntityKind::Benchmark => "benchmark",
            EntityKind::BenchmarkResult => "benchmark_result",
            EntityKind::Opinion => "opinion",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "model" | "models" => Some(EntityKind::Model),
            "benchmark" | "benchmarks" => Some(EntityKind::Benchmark),
            "benchmark_result" | "benchmark_results" | "result" => {
                Some(EntityKind::BenchmarkResult)
            }
            "opinion" | "opinions" => Some(EntityKind::Opinion),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether every optional field of a validated entity was populated
///
/// Informational only; a `Partial` entity is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// All required and optional fields present
    Complete,

    /// At least one optional field was absent
    Partial,
}

/// Draft of an AI model record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDraft {
    /// Technical identifier, normalised (e.g. "gpt-4")
    pub name: String,

    /// Brief description of capabilities
    pub description: String,

    /// Organization that created the model
    pub organization: Option<String>,

    /// Release date
    pub release_date: Option<NaiveDate>,

    /// License type (Apache 2.0, MIT, Proprietary, ...)
    pub license: Option<String>,

    /// Free-form details (pricing, context window, capabilities)
    pub metadata: Option<Map<String, Value>>,
}

/// Draft of a benchmark record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDraft {
    /// Benchmark name
    pub name: String,

    /// Category (reasoning, coding, ...)
    pub category: Option<String>,

    /// What the benchmark measures
    pub description: Option<String>,

    /// Reference URL
    pub url: Option<String>,
}

/// Draft of a benchmark result (model × benchmark score)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResultDraft {
    /// Model the score belongs to
    pub model_name: String,

    /// Benchmark the score was measured on
    pub benchmark_name: String,

    /// Reported score
    pub score: f64,

    /// When the evaluation was run
    pub date_tested: Option<NaiveDate>,

    /// Where the score was reported
    pub source: Option<String>,
}

/// Draft of an opinion about a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionDraft {
    /// Model the opinion is about
    pub model_name: String,

    /// Opinion text
    pub content: String,

    /// Sentiment label (positive, negative, mixed, ...)
    pub sentiment: Option<String>,

    /// Publication or site
    pub source: Option<String>,

    /// Author name
    pub author: Option<String>,

    /// Publication date
    pub date_published: Option<NaiveDate>,

    /// Topic tags
    pub tags: Option<Vec<String>>,
}

/// A typed draft for one of the catalogue entity kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDraft {
    /// Model draft
    Model(ModelDraft),
    /// Benchmark draft
    Benchmark(BenchmarkDraft),
    /// Benchmark result draft
    BenchmarkResult(BenchmarkResultDraft),
    /// Opinion draft
    Opinion(OpinionDraft),
}

impl EntityDraft {
    /// Kind of this draft
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDraft::Model(_) => EntityKind::Model,
            EntityDraft::Benchmark(_) => EntityKind::Benchmark,
            EntityDraft::BenchmarkResult(_) => EntityKind::BenchmarkResult,
            EntityDraft::Opinion(_) => EntityKind::Opinion,
        }
    }

    /// Natural key a record store would use for uniqueness
    ///
    /// Opinions have no natural key beyond their content, so the key is
    /// model name plus content.
    pub fn natural_key(&self) -> String {
        match self {
            EntityDraft::Model(m) => m.name.clone(),
            EntityDraft::Benchmark(b) => b.name.clone(),
            EntityDraft::BenchmarkResult(r) => format!(
                "{}/{}/{}",
                r.model_name,
                r.benchmark_name,
                r.date_tested.map(|d| d.to_string()).unwrap_or_default()
            ),
            EntityDraft::Opinion(o) => format!("{}/{}", o.model_name, o.content),
        }
    }
}

/// A candidate catalogue record that passed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedEntity {
    /// The typed draft
    pub draft: EntityDraft,

    /// Whether all optional fields were populated
    pub confidence: Confidence,
}

impl ValidatedEntity {
    /// Kind of the wrapped draft
    pub fn kind(&self) -> EntityKind {
        self.draft.kind()
    }
}
