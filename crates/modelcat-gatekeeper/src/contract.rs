//! Field contracts per entity kind

use modelcat_domain::EntityKind;
use serde_json::{json, Map, Value};
use std::fmt;

/// Type tag of a contract field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// ISO date, `YYYY-MM-DD` (or `YYYY-MM`, pinned to day 1)
    Date,
    /// Finite number
    Number,
    /// JSON object
    Mapping,
    /// Array of strings
    StringList,
}

impl FieldType {
    /// Type name as used in rejection messages
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Mapping => "mapping",
            FieldType::StringList => "string list",
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({"type": ["string", "null"]}),
            FieldType::Date => json!({"type": ["string", "null"], "format": "date"}),
            FieldType::Number => json!({"type": ["number", "null"]}),
            FieldType::Mapping => json!({"type": ["object", "null"]}),
            FieldType::StringList => json!({"type": ["array", "null"], "items": {"type": "string"}}),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of an entity contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key in the upstream field map
    pub name: &'static str,

    /// Expected type
    pub field_type: FieldType,

    /// Whether the field must be present and non-null
    pub required: bool,

    /// Guidance shown to the upstream service
    pub description: &'static str,
}

impl FieldSpec {
    const fn required(name: &'static str, field_type: FieldType, description: &'static str) -> Self {
        Self { name, field_type, required: true, description }
    }

    const fn optional(name: &'static str, field_type: FieldType, description: &'static str) -> Self {
        Self { name, field_type, required: false, description }
    }
}

const MODEL_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("model_name", FieldType::String, "Technical model identifier, lowercase with hyphens (e.g. gpt-4, claude-3-opus)"),
    FieldSpec::required("description", FieldType::String, "Brief description of the model's capabilities"),
    FieldSpec::optional("organization", FieldType::String, "Organization that created the model (OpenAI, Anthropic, Google, ...)"),
    FieldSpec::optional("release_date", FieldType::Date, "Release date as YYYY-MM-DD"),
    FieldSpec::optional("license", FieldType::String, "License type (Apache 2.0, MIT, Proprietary, ...)"),
    FieldSpec::optional("metadata", FieldType::Mapping, "Additional details such as pricing, context window, capabilities"),
];

const BENCHMARK_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::String, "Benchmark name (MMLU, HumanEval, GSM8K, ...)"),
    FieldSpec::optional("category", FieldType::String, "Category (reasoning, coding, math, knowledge, ...)"),
    FieldSpec::optional("description", FieldType::String, "What the benchmark measures"),
    FieldSpec::optional("url", FieldType::String, "Reference URL for the benchmark"),
];

const BENCHMARK_RESULT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("model_name", FieldType::String, "Model that was evaluated, lowercase with hyphens"),
    FieldSpec::required("benchmark_name", FieldType::String, "Benchmark the model was evaluated on"),
    FieldSpec::required("score", FieldType::Number, "Reported score as a number"),
    FieldSpec::optional("date_tested", FieldType::Date, "Evaluation date as YYYY-MM-DD"),
    FieldSpec::optional("source", FieldType::String, "Where the score was reported"),
];

const OPINION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("model_name", FieldType::String, "Model the opinion is about, lowercase with hyphens"),
    FieldSpec::required("content", FieldType::String, "The opinion, quoted or closely paraphrased"),
    FieldSpec::optional("sentiment", FieldType::String, "positive, negative, neutral or mixed"),
    FieldSpec::optional("source", FieldType::String, "Publication or site the opinion appeared in"),
    FieldSpec::optional("author", FieldType::String, "Author of the opinion"),
    FieldSpec::optional("date_published", FieldType::Date, "Publication date as YYYY-MM-DD"),
    FieldSpec::optional("tags", FieldType::StringList, "Topic tags"),
];

/// Field contract of an entity kind, in declaration order
///
/// # Examples
///
/// ```
/// use modelcat_domain::EntityKind;
/// use modelcat_gatekeeper::contract;
///
/// let required: Vec<_> = contract(EntityKind::BenchmarkResult)
///     .iter()
///     .filter(|f| f.required)
///     .map(|f| f.name)
///     .collect();
/// assert_eq!(required, ["model_name", "benchmark_name", "score"]);
/// ```
pub fn contract(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::Model => MODEL_FIELDS,
        EntityKind::Benchmark => BENCHMARK_FIELDS,
        EntityKind::BenchmarkResult => BENCHMARK_RESULT_FIELDS,
        EntityKind::Opinion => OPINION_FIELDS,
    }
}

/// JSON schema of an entity kind's contract
///
/// Every property is present in `required` so the upstream always answers
/// each key, using `null` for values not found in the text.
pub fn schema_for(kind: EntityKind) -> Value {
    let fields = contract(kind);
    let mut properties = Map::new();
    for field in fields {
        let mut schema = field.field_type.json_schema();
        if let Value::Object(ref mut obj) = schema {
            obj.insert("description".to_string(), Value::from(field.description));
        }
        properties.insert(field.name.to_string(), schema);
    }
    let required: Vec<&str> = fields.iter().map(|f| f.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
