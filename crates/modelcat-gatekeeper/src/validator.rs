//! Response validation logic

use crate::contract::{contract, FieldSpec, FieldType};
use crate::normalize::{normalize_model_name, parse_date};
use crate::ValidationConfig;
use chrono::NaiveDate;
use modelcat_domain::{
    BenchmarkDraft, BenchmarkResultDraft, Confidence, EntityDraft, EntityKind, ModelDraft,
    OpinionDraft, ValidatedEntity,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Why a field failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Required key absent from the response
    Missing {
        /// Field name
        field: String,
    },

    /// Required field answered with `null` (not found in the text)
    NotFound {
        /// Field name
        field: String,
    },

    /// Value present but of the wrong type
    WrongType {
        /// Field name
        field: String,
        /// Contract type
        expected: String,
        /// What was supplied
        found: String,
    },

    /// Required string present but blank
    Empty {
        /// Field name
        field: String,
    },
}

impl RejectionReason {
    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            RejectionReason::Missing { field }
            | RejectionReason::NotFound { field }
            | RejectionReason::WrongType { field, .. }
            | RejectionReason::Empty { field } => field,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Missing { field } => write!(f, "{}: missing", field),
            RejectionReason::NotFound { field } => write!(f, "{}: not found in text", field),
            RejectionReason::WrongType { field, expected, found } => {
                write!(f, "{}: expected {}, found {}", field, expected, found)
            }
            RejectionReason::Empty { field } => write!(f, "{}: empty", field),
        }
    }
}

/// A field value that passed its type check
#[derive(Debug, Clone)]
enum Checked {
    Str(String),
    Date(NaiveDate),
    Number(f64),
    Mapping(Map<String, Value>),
    List(Vec<String>),
}

/// Checked values of one response, keyed by field name
struct CheckedFields(HashMap<&'static str, Checked>);

impl CheckedFields {
    fn string(&mut self, name: &str) -> Option<String> {
        match self.0.remove(name) {
            Some(Checked::Str(s)) => Some(s),
            _ => None,
        }
    }

    fn date(&mut self, name: &str) -> Option<NaiveDate> {
        match self.0.remove(name) {
            Some(Checked::Date(d)) => Some(d),
            _ => None,
        }
    }

    fn number(&mut self, name: &str) -> Option<f64> {
        match self.0.remove(name) {
            Some(Checked::Number(n)) => Some(n),
            _ => None,
        }
    }

    fn mapping(&mut self, name: &str) -> Option<Map<String, Value>> {
        match self.0.remove(name) {
            Some(Checked::Mapping(m)) => Some(m),
            _ => None,
        }
    }

    fn list(&mut self, name: &str) -> Option<Vec<String>> {
        match self.0.remove(name) {
            Some(Checked::List(l)) => Some(l),
            _ => None,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validates upstream field maps against entity contracts
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    config: ValidationConfig,
}

impl ResponseValidator {
    /// Create a new validator with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a field map against the contract of `kind`
    ///
    /// Every contract field is checked, so all rejection reasons are
    /// reported together. Keys outside the contract are dropped.
    ///
    /// # Returns
    ///
    /// The typed entity, or every field-level rejection reason
    pub fn validate(
        &self,
        kind: EntityKind,
        fields: &Map<String, Value>,
    ) -> Result<ValidatedEntity, Vec<RejectionReason>> {
        let mut reasons = Vec::new();
        let mut checked = HashMap::new();
        let mut optional_missing = false;

        for spec in contract(kind) {
            match fields.get(spec.name) {
                None if spec.required => reasons.push(RejectionReason::Missing {
                    field: spec.name.to_string(),
                }),
                Some(Value::Null) if spec.required => reasons.push(RejectionReason::NotFound {
                    field: spec.name.to_string(),
                }),
                None | Some(Value::Null) => optional_missing = true,
                Some(value) => match self.check(spec, value) {
                    Ok(Some(v)) => {
                        checked.insert(spec.name, v);
                    }
                    Ok(None) if spec.required => reasons.push(RejectionReason::Empty {
                        field: spec.name.to_string(),
                    }),
                    Ok(None) => optional_missing = true,
                    Err(reason) => reasons.push(reason),
                },
            }
        }

        if !reasons.is_empty() {
            return Err(reasons);
        }

        let confidence = if optional_missing {
            Confidence::Partial
        } else {
            Confidence::Complete
        };

        let draft = self.build(kind, CheckedFields(checked));
        Ok(ValidatedEntity { draft, confidence })
    }

    /// Type-check one non-null value
    ///
    /// `Ok(None)` means the value is blank and counts as absent.
    fn check(&self, spec: &FieldSpec, value: &Value) -> Result<Option<Checked>, RejectionReason> {
        let wrong_type = || RejectionReason::WrongType {
            field: spec.name.to_string(),
            expected: spec.field_type.as_str().to_string(),
            found: json_type_name(value).to_string(),
        };

        match (spec.field_type, value) {
            (FieldType::String, Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    self.blank(spec)
                } else if spec.name == "model_name" && self.config.normalize_model_names {
                    let normalized = normalize_model_name(trimmed);
                    if normalized.is_empty() {
                        self.blank(spec)
                    } else {
                        Ok(Some(Checked::Str(normalized)))
                    }
                } else {
                    Ok(Some(Checked::Str(trimmed.to_string())))
                }
            }
            (FieldType::Date, Value::String(s)) => {
                if s.trim().is_empty() {
                    return self.blank(spec);
                }
                parse_date(s)
                    .map(|d| Some(Checked::Date(d)))
                    .ok_or_else(|| RejectionReason::WrongType {
                        field: spec.name.to_string(),
                        expected: spec.field_type.as_str().to_string(),
                        found: format!("string {:?}", s),
                    })
            }
            (FieldType::Number, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| Some(Checked::Number(f)))
                .ok_or_else(wrong_type),
            (FieldType::Number, Value::String(s)) if self.config.coerce_numeric_strings => s
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| Some(Checked::Number(f)))
                .ok_or_else(wrong_type),
            (FieldType::Mapping, Value::Object(map)) => Ok(Some(Checked::Mapping(map.clone()))),
            (FieldType::Mapping, Value::String(s)) if self.config.parse_embedded_json => {
                match serde_json::from_str::<Value>(s) {
                    Ok(Value::Object(map)) => Ok(Some(Checked::Mapping(map))),
                    _ => Err(wrong_type()),
                }
            }
            (FieldType::StringList, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(|s| s.trim().to_string()))
                .collect::<Option<Vec<_>>>()
                .map(|list| {
                    let list: Vec<String> = list.into_iter().filter(|s| !s.is_empty()).collect();
                    if list.is_empty() {
                        None
                    } else {
                        Some(Checked::List(list))
                    }
                })
                .ok_or_else(wrong_type),
            _ => Err(wrong_type()),
        }
    }

    fn blank(&self, spec: &FieldSpec) -> Result<Option<Checked>, RejectionReason> {
        if spec.required || self.config.blank_optional_as_null {
            Ok(None)
        } else {
            Err(RejectionReason::Empty {
                field: spec.name.to_string(),
            })
        }
    }

    /// Build the typed draft; required fields are known to be present
    fn build(&self, kind: EntityKind, mut f: CheckedFields) -> EntityDraft {
        match kind {
            EntityKind::Model => EntityDraft::Model(ModelDraft {
                name: f.string("model_name").unwrap_or_default(),
                description: f.string("description").unwrap_or_default(),
                organization: f.string("organization"),
                release_date: f.date("release_date"),
                license: f.string("license"),
                metadata: f.mapping("metadata"),
            }),
            EntityKind::Benchmark => EntityDraft::Benchmark(BenchmarkDraft {
                name: f.string("name").unwrap_or_default(),
                category: f.string("category"),
                description: f.string("description"),
                url: f.string("url"),
            }),
            EntityKind::BenchmarkResult => EntityDraft::BenchmarkResult(BenchmarkResultDraft {
                model_name: f.string("model_name").unwrap_or_default(),
                benchmark_name: f.string("benchmark_name").unwrap_or_default(),
                score: f.number("score").unwrap_or_default(),
                date_tested: f.date("date_tested"),
                source: f.string("source"),
            }),
            EntityKind::Opinion => EntityDraft::Opinion(OpinionDraft {
                model_name: f.string("model_name").unwrap_or_default(),
                content: f.string("content").unwrap_or_default(),
                sentiment: f.string("sentiment"),
                source: f.string("source"),
                author: f.string("author"),
                date_published: f.date("date_published"),
                tags: f.list("tags"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fields must be an object"),
        }
    }

    fn validator() -> ResponseValidator {
        ResponseValidator::new(ValidationConfig::default())
    }

    #[test]
    fn test_complete_model() {
        let entity = validator()
            .validate(
                EntityKind::Model,
                &fields(json!({
                    "model_name": "GPT-4",
                    "description": "Large multimodal model",
                    "organization": "OpenAI",
                    "release_date": "2023-03-14",
                    "license": "Proprietary",
                    "metadata": {"context_window": 8192}
                })),
            )
            .unwrap();

        assert_eq!(entity.confidence, Confidence::Complete);
        match entity.draft {
            EntityDraft::Model(m) => {
                assert_eq!(m.name, "gpt-4");
                assert_eq!(m.release_date, NaiveDate::from_ymd_opt(2023, 3, 14));
                assert_eq!(m.metadata.unwrap()["context_window"], 8192);
            }
            other => panic!("unexpected draft {:?}", other),
        }
    }

    #[test]
    fn test_missing_optional_is_partial() {
        let entity = validator()
            .validate(
                EntityKind::Model,
                &fields(json!({"model_name": "gpt-4", "description": "LLM"})),
            )
            .unwrap();
        assert_eq!(entity.confidence, Confidence::Partial);
    }

    #[test]
    fn test_missing_required_is_rejected() {
        let reasons = validator()
            .validate(EntityKind::Model, &fields(json!({"model_name": "gpt-4"})))
            .unwrap_err();
        assert_eq!(
            reasons,
            vec![RejectionReason::Missing {
                field: "description".to_string()
            }]
        );
    }

    #[test]
    fn test_null_required_is_not_found() {
        let reasons = validator()
            .validate(
                EntityKind::Benchmark,
                &fields(json!({"name": null, "category": "coding"})),
            )
            .unwrap_err();
        assert_eq!(reasons[0], RejectionReason::NotFound { field: "name".to_string() });
    }

    #[test]
    fn test_blank_required_is_empty() {
        let reasons = validator()
            .validate(
                EntityKind::Opinion,
                &fields(json!({"model_name": "gpt-4", "content": "   "})),
            )
            .unwrap_err();
        assert_eq!(reasons[0], RejectionReason::Empty { field: "content".to_string() });
    }

    #[test]
    fn test_all_reasons_reported() {
        let reasons = validator()
            .validate(
                EntityKind::BenchmarkResult,
                &fields(json!({"model_name": 4, "score": "high"})),
            )
            .unwrap_err();
        let names: Vec<_> = reasons.iter().map(|r| r.field()).collect();
        assert_eq!(names, ["model_name", "benchmark_name", "score"]);
        assert!(matches!(reasons[0], RejectionReason::WrongType { .. }));
        assert!(matches!(reasons[1], RejectionReason::Missing { .. }));
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let entity = validator()
            .validate(
                EntityKind::Benchmark,
                &fields(json!({"name": "MMLU", "rogue": true})),
            )
            .unwrap();
        let serialized = serde_json::to_value(&entity.draft).unwrap();
        assert!(serialized.get("rogue").is_none());
    }

    #[test]
    fn test_numeric_string_coercion() {
        let input = fields(json!({
            "model_name": "gpt-4",
            "benchmark_name": "MMLU",
            "score": "86.4%"
        }));

        let entity = validator().validate(EntityKind::BenchmarkResult, &input).unwrap();
        match entity.draft {
            EntityDraft::BenchmarkResult(r) => assert_eq!(r.score, 86.4),
            other => panic!("unexpected draft {:?}", other),
        }

        let strict = ResponseValidator::new(ValidationConfig::strict());
        let reasons = strict.validate(EntityKind::BenchmarkResult, &input).unwrap_err();
        assert_eq!(reasons[0].field(), "score");
    }

    #[test]
    fn test_month_only_date_pinned_to_first() {
        let entity = validator()
            .validate(
                EntityKind::Model,
                &fields(json!({
                    "model_name": "gpt-4",
                    "description": "LLM",
                    "release_date": "2023-03"
                })),
            )
            .unwrap();
        match entity.draft {
            EntityDraft::Model(m) => {
                assert_eq!(m.release_date, NaiveDate::from_ymd_opt(2023, 3, 1))
            }
            other => panic!("unexpected draft {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_date_is_wrong_type() {
        let reasons = validator()
            .validate(
                EntityKind::Model,
                &fields(json!({
                    "model_name": "gpt-4",
                    "description": "LLM",
                    "release_date": "last spring"
                })),
            )
            .unwrap_err();
        assert!(matches!(&reasons[0], RejectionReason::WrongType { field, .. } if field == "release_date"));
    }

    #[test]
    fn test_embedded_json_metadata() {
        let entity = validator()
            .validate(
                EntityKind::Model,
                &fields(json!({
                    "model_name": "gpt-4",
                    "description": "LLM",
                    "metadata": "{\"pricing\": \"$30/M\"}"
                })),
            )
            .unwrap();
        match entity.draft {
            EntityDraft::Model(m) => assert_eq!(m.metadata.unwrap()["pricing"], "$30/M"),
            other => panic!("unexpected draft {:?}", other),
        }
    }

    #[test]
    fn test_tags_must_be_strings() {
        let reasons = validator()
            .validate(
                EntityKind::Opinion,
                &fields(json!({
                    "model_name": "gpt-4",
                    "content": "Great at code",
                    "tags": ["coding", 3]
                })),
            )
            .unwrap_err();
        assert_eq!(reasons[0].field(), "tags");
    }

    #[test]
    fn test_blank_optional_strict_is_rejected() {
        let input = fields(json!({"name": "MMLU", "url": " "}));
        assert!(validator().validate(EntityKind::Benchmark, &input).is_ok());

        let strict = ResponseValidator::new(ValidationConfig::strict());
        let reasons = strict.validate(EntityKind::Benchmark, &input).unwrap_err();
        assert_eq!(reasons[0], RejectionReason::Empty { field: "url".to_string() });
    }

    #[test]
    fn test_rejection_display() {
        let reason = RejectionReason::WrongType {
            field: "score".to_string(),
            expected: "number".to_string(),
            found: "boolean".to_string(),
        };
        assert_eq!(reason.to_string(), "score: expected number, found boolean");
    }

    proptest! {
        #[test]
        fn prop_validation_is_deterministic(name in "[a-zA-Z0-9 ]{1,20}", desc in "[a-z ]{0,20}") {
            let input = fields(json!({"model_name": name, "description": desc}));
            let first = validator().validate(EntityKind::Model, &input);
            let second = validator().validate(EntityKind::Model, &input);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_required_keys_removed_are_reported(drop_mask in 0u8..8) {
            let mut input = fields(json!({
                "model_name": "gpt-4",
                "benchmark_name": "mmlu",
                "score": 86.4
            }));
            let names = ["model_name", "benchmark_name", "score"];
            for (i, name) in names.iter().enumerate() {
                if drop_mask & (1 << i) != 0 {
                    input.remove(*name);
                }
            }
            let result = validator().validate(EntityKind::BenchmarkResult, &input);
            prop_assert_eq!(result.is_err(), drop_mask != 0);
            if let Err(reasons) = result {
                prop_assert_eq!(reasons.len() as u32, drop_mask.count_ones());
            }
        }
    }
}
