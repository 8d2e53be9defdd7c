//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prompt assembly settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum input text length (characters)
    pub max_text_length: usize,

    /// Include the worked example segment for each kind
    pub include_examples: bool,
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_text_length: 50_000,
            include_examples: true,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: smaller inputs, no worked examples
    pub fn aggressive() -> Self {
        Self {
            max_text_length: 20_000,
            include_examples: false,
        }
    }

    /// Lenient preset: larger inputs accepted
    pub fn lenient() -> Self {
        Self {
            max_text_length: 100_000,
            include_examples: true,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
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

/// Call and retry settings for the extraction client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum attempts per call, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds); doubles each retry
    pub base_delay_ms: u64,

    /// Upper bound on any single backoff delay (milliseconds)
    pub max_delay_ms: u64,

    /// Hard timeout for a single attempt (seconds)
    pub attempt_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            attempt_timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    /// Aggressive preset: fail fast
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            attempt_timeout_secs: 60,
        }
    }

    /// Lenient preset: ride out longer outages
    pub fn lenient() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
            attempt_timeout_secs: 300,
        }
    }

    /// Delay before the first retry
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Cap on a single backoff delay
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Per-attempt timeout
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Delay to sleep after failed attempt `attempt` (1-based)
    ///
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelcat_extractor::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::default();
    /// assert_eq!(config.backoff(1), Duration::from_secs(1));
    /// assert_eq!(config.backoff(2), Duration::from_secs(2));
    /// assert_eq!(config.backoff(10), Duration::from_secs(30));
    /// ```
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay().saturating_mul(factor).min(self.max_delay())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("base_delay_ms cannot exceed max_delay_ms".to_string());
        }
        if self.attempt_timeout_secs == 0 {
            return Err("attempt_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Reusable-context cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a registered segment stays reusable upstream (seconds)
    pub reuse_window_secs: u64,

    /// Maximum tracked segments before least recently used are evicted
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // Upstream ephemeral cache entries live five minutes
        Self {
            reuse_window_secs: 300,
            capacity: 256,
        }
    }
}

impl CacheConfig {
    /// Reuse window as a Duration
    pub fn reuse_window(&self) -> Duration {
        Duration::from_secs(self.reuse_window_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
        assert!(ClientConfig::default().validate().is_ok());
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
        assert!(ClientConfig::aggressive().validate().is_ok());
        assert!(ClientConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_max_text_length() {
        let mut config = ExtractorConfig::default();
        config.max_text_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = ClientConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let config = ClientConfig {
            base_delay_ms: 100,
            max_delay_ms: 500,
            ..ClientConfig::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
        assert_eq!(config.backoff(4), Duration::from_millis(500));
        assert_eq!(config.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let parsed = ExtractorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 1_000);
    }
}
