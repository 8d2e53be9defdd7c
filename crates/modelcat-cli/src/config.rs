//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use modelcat_extractor::{CacheConfig, ClientConfig, ExtractorConfig};
use modelcat_gatekeeper::ValidationConfig;
use modelcat_ingest::{FeedConfig, IngestConfig};
use modelcat_llm::anthropic::{DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
///
/// One TOML file with a section per pipeline stage. Missing sections and
/// keys fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prompt assembly
    pub extractor: ExtractorConfig,

    /// Retry and timeout policy
    pub client: ClientConfig,

    /// Reusable context window
    pub cache: CacheConfig,

    /// Response validation
    pub validation: ValidationConfig,

    /// Batch orchestration
    pub ingest: IngestConfig,

    /// Database location
    pub storage: StorageSettings,

    /// Upstream model selection
    pub upstream: UpstreamSettings,

    /// Feed for `run-batch`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<FeedConfig>,

    /// Output settings
    pub settings: Settings,
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file holding both the catalogue and the ledger
    pub database_path: PathBuf,
}

/// Upstream service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Model identifier
    pub model: String,

    /// API base URL
    pub endpoint: String,

    /// Generation budget per call
    pub max_tokens: u32,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enable colored output
    pub color: bool,

    /// Default output format
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".modelcat").join("config.toml"))
    }

    /// Resolve an explicit path or fall back to the default.
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load configuration from file, or defaults if the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(path)?;

        let config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("extractor", self.extractor.validate()),
            ("client", self.client.validate()),
            ("cache", self.cache.validate()),
            ("ingest", self.ingest.validate()),
        ];
        for (section, check) in checks {
            check.map_err(|e| CliError::Config(format!("[{}] {}", section, e)))?;
        }
        if let Some(feed) = &self.feed {
            feed.validate().map_err(|e| CliError::Config(format!("[feed] {}", e)))?;
        }
        if self.upstream.model.trim().is_empty() {
            return Err(CliError::Config("[upstream] model must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let database_path = dirs::home_dir()
            .map(|home| home.join(".modelcat").join("modelcat.db"))
            .unwrap_or_else(|| PathBuf::from("modelcat.db"));
        Self { database_path }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}
