//! Configuration for the facet execution engine
//!
//! Loaded from a TOML file; every field has a default so an empty file is valid.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub facets: FacetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SearchConfig {
    /// Field holding the document type, used to scope searches to requested types
    #[serde(default = "default_type_field")]
    pub type_field: String,
    /// Number of top hits kept by the main query
    #[serde(default = "default_size")]
    pub default_size: usize,
}

fn default_type_field() -> String {
    "_type".to_string()
}

fn default_size() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            type_field: default_type_field(),
            default_size: default_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FacetConfig {
    /// Share one index scan between global collector facets with the same filter.
    /// Disable to give every global collector facet its own scan.
    #[serde(default = "default_true")]
    pub batch_global_collectors: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            batch_global_collectors: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            file: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            Self::from_toml_str(&content)
        } else {
            let config = Config::default();
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = config.save(config_path);
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}
