//! Configuration for the braid retrieval backend.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::ingest::DEDUP_SCAN_LIMIT;
use crate::types::HybridSearchConfig;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingestion: IngestionConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            // Current directory
            PathBuf::from("braid.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("braid/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.ingestion.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Default chunk size in approximate tokens.
    pub chunk_size_tokens: usize,
    /// Default overlap between consecutive chunks, in approximate tokens.
    pub overlap_tokens: usize,
    /// Run the content-hash dedup check before ingesting.
    pub dedup_enabled: bool,
    /// How many keyword-index entries the dedup check scans. Above this
    /// volume duplicates may go undetected; see `ingest::DEDUP_SCAN_LIMIT`.
    pub dedup_scan_limit: usize,
    /// Bound on concurrent per-chunk embed/write operations.
    pub max_concurrent_embeds: usize,
    /// Vector store collection name.
    pub collection: String,
    /// Keyword store index name.
    pub index: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 500,
            overlap_tokens: 50,
            dedup_enabled: true,
            dedup_scan_limit: DEDUP_SCAN_LIMIT,
            max_concurrent_embeds: 4,
            collection: "documents".to_string(),
            index: "chunks".to_string(),
        }
    }
}

impl IngestionConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size_tokens == 0 {
            return Err(ConfigError::Invalid("chunk_size_tokens must be > 0".to_string()).into());
        }
        if self.overlap_tokens >= self.chunk_size_tokens {
            return Err(ConfigError::Invalid(format!(
                "overlap_tokens ({}) must be smaller than chunk_size_tokens ({})",
                self.overlap_tokens, self.chunk_size_tokens
            ))
            .into());
        }
        if self.dedup_scan_limit == 0 {
            return Err(ConfigError::Invalid("dedup_scan_limit must be > 0".to_string()).into());
        }
        if self.max_concurrent_embeds == 0 {
            return Err(
                ConfigError::Invalid("max_concurrent_embeds must be > 0".to_string()).into(),
            );
        }
        if self.collection.is_empty() {
            return Err(ConfigError::MissingField("ingestion.collection".to_string()).into());
        }
        if self.index.is_empty() {
            return Err(ConfigError::MissingField("ingestion.index".to_string()).into());
        }
        Ok(())
    }
}

/// Search configuration: fusion policy plus per-sub-search timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Fusion weights and score floors.
    #[serde(flatten)]
    pub hybrid: HybridSearchConfig,
    /// Timeout for each sub-search in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hybrid: HybridSearchConfig::default(),
            timeout_ms: 5000,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<()> {
        self.hybrid.validate()?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be > 0".to_string()).into());
        }
        Ok(())
    }
}
