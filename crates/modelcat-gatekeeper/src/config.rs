//! Gatekeeper configuration

use crate::GatekeeperError;
use serde::{Deserialize, Serialize};

/// Configuration for response validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Rewrite model names to lowercase-with-hyphens ("GPT 4" -> "gpt-4")
    pub normalize_model_names: bool,

    /// Accept numeric strings ("86.4") for number fields
    pub coerce_numeric_strings: bool,

    /// Accept a JSON-encoded string for mapping fields
    pub parse_embedded_json: bool,

    /// Treat a blank optional string as absent instead of rejecting it
    pub blank_optional_as_null: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            normalize_model_names: true,
            coerce_numeric_strings: true,
            parse_embedded_json: true,
            blank_optional_as_null: true,
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (every coercion enabled)
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Create a strict configuration (values must already have the contract type)
    pub fn strict() -> Self {
        Self {
            normalize_model_names: true,
            coerce_numeric_strings: false,
            parse_embedded_json: false,
            blank_optional_as_null: false,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, GatekeeperError> {
        toml::from_str(toml_str)
            .map_err(|e| GatekeeperError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, GatekeeperError> {
        toml::to_string_pretty(self)
            .map_err(|e| GatekeeperError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert!(config.normalize_model_names);
        assert!(config.coerce_numeric_strings);
    }

    #[test]
    fn test_strict_config() {
        let config = ValidationConfig::strict();
        assert!(!config.coerce_numeric_strings);
        assert!(!config.parse_embedded_json);
        assert!(!config.blank_optional_as_null);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ValidationConfig::from_toml("coerce_numeric_strings = false").unwrap();
        assert!(!config.coerce_numeric_strings);
        assert!(config.normalize_model_names);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ValidationConfig::strict();
        let parsed = ValidationConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}
