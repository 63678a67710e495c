//! Configuration Storage
//!
//! This module handles the optional on-disk configuration file
//! (API keys, model settings and display preferences).

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Persistent configuration data
///
/// Every field is optional; anything missing falls back to the
/// environment or to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Selected provider ("anthropic" or "openai")
    pub provider: Option<String>,
    /// Model override for the selected provider
    pub model: Option<String>,
    /// API keys for LLM providers
    pub api_keys: HashMap<String, String>,
    /// Custom API endpoint
    pub api_base_url: Option<String>,
    /// Path to the SQLite database
    pub database_path: Option<PathBuf>,
    /// Completion token limit
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// HTTP request timeout
    pub timeout_secs: Option<u64>,
    /// Let generated statements write to the database
    pub allow_writes: Option<bool>,
    /// ANSI colors in terminal output
    pub color: Option<bool>,
    /// Row cap for result tables
    pub max_display_rows: Option<usize>,
    /// Default tracing filter
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sql-agent"))
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Load the configuration from the default location
    ///
    /// A missing file (or an unknown config directory) yields the
    /// default configuration.
    pub fn load_default() -> Result<Self> {
        match Self::config_file() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
            .map_err(|e| AgentError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get API key for a provider
    pub fn get_api_key(&self, provider: &str) -> Option<&String> {
        self.api_keys.get(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = FileConfig::parse(
            r#"
provider = "openai"
model = "gpt-4o-mini"
database_path = "data/shop.db"
max_tokens = 2048
allow_writes = false
color = false

[api_keys]
openai = "sk-test"
"#,
        )
        .unwrap();

        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.database_path, Some(PathBuf::from("data/shop.db")));
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.get_api_key("openai"), Some(&"sk-test".to_string()));
        assert_eq!(config.get_api_key("anthropic"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_tokens = \"lots\"").unwrap();

        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
