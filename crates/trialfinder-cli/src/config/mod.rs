//! Configuration loading for trialfinder.
//! Reads trialfinder.toml from the current directory or the path in the
//! TRIALFINDER_CONFIG env var. Every section is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use trialfinder_ingestion::{CacheConfig, FetchConfig};
use trialfinder_ranker::WeightVector;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub weights: WeightVector,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Rows printed to the terminal.
    #[serde(default = "default_top")]
    pub top: usize,
    /// Reasons shown per printed row.
    #[serde(default = "default_max_reasons")]
    pub max_reasons: usize,
}

fn default_top() -> usize { 20 }
fn default_max_reasons() -> usize { 6 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { top: default_top(), max_reasons: default_max_reasons() }
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "trialfinder.toml";

impl Config {
    /// Load configuration. An explicit path must exist; the default path
    /// (TRIALFINDER_CONFIG or ./trialfinder.toml) falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let path = std::env::var("TRIALFINDER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if !Path::new(&path).exists() {
            warn!(path = %path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.weights.validate() {
            anyhow::bail!("Invalid [weights]: bonuses must be >= 0 and penalties <= 0");
        }
        if self.fetch.page_size == 0 || self.fetch.page_size > 1_000 {
            anyhow::bail!("fetch.page_size must be between 1 and 1000 (got {})", self.fetch.page_size);
        }
        if self.fetch.max_pages == 0 {
            anyhow::bail!("fetch.max_pages must be at least 1");
        }
        Ok(())
    }
}
