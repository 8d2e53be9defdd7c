//! Configuration for ingestion runs

use modelcat_domain::EntityKind;
use serde::{Deserialize, Serialize};

/// Configuration for the ingestion orchestrator
///
/// # Examples
///
/// ```
/// use modelcat_ingest::IngestConfig;
///
/// let config = IngestConfig::default();
/// assert_eq!(config.max_concurrency, 4);
///
/// let config = IngestConfig::aggressive();
/// assert_eq!(config.max_concurrency, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum feed items processed at once
    pub max_concurrency: usize,

    /// Entity kind used for manual submissions and feed items without a hint
    pub default_kind: EntityKind,

    /// Append a skipped-duplicate ledger entry for every skipped item
    pub record_skips: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            default_kind: EntityKind::Model,
            record_skips: true,
        }
    }
}

impl IngestConfig {
    /// Aggressive preset: more parallel upstream calls
    pub fn aggressive() -> Self {
        Self {
            max_concurrency: 8,
            ..Self::default()
        }
    }

    /// Lenient preset: gentle on upstream rate limits, quieter ledger
    pub fn lenient() -> Self {
        Self {
            max_concurrency: 2,
            record_skips: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(IngestConfig::default().validate().is_ok());
        assert!(IngestConfig::aggressive().validate().is_ok());
        assert!(IngestConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = IngestConfig {
            max_concurrency: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_kind_names() {
        let config = IngestConfig::from_toml("default_kind = \"benchmark_result\"").unwrap();
        assert_eq!(config.default_kind, EntityKind::BenchmarkResult);
        assert_eq!(config.max_concurrency, 4);

        let round_trip = IngestConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }
}
