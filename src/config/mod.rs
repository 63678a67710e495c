//! Configuration module
//!
//! Resolves the runtime [`Settings`] from the environment, an optional
//! config file and built-in defaults, in that order of precedence.

pub mod storage;

use crate::error::{AgentError, Result};
use crate::llm::providers::{anthropic, openai};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use storage::FileConfig;

/// Default database file, relative to the working directory
pub const DEFAULT_DATABASE_PATH: &str = "shop.db";

/// Default completion token limit
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default HTTP request timeout (in seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of rows shown in a result table
pub const DEFAULT_MAX_DISPLAY_ROWS: usize = 20;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Anthropic Messages API
    #[default]
    Anthropic,
    /// OpenAI Chat Completions API
    OpenAI,
}

impl ProviderKind {
    /// Config/env name of this provider
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAI => "openai",
        }
    }

    /// Environment variable holding the credential
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => anthropic::DEFAULT_MODEL,
            ProviderKind::OpenAI => openai::DEFAULT_MODEL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::OpenAI),
            other => Err(AgentError::Config(format!(
                "Unknown provider '{}'. Supported: anthropic, openai",
                other
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolved application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub database_path: PathBuf,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub allow_writes: bool,
    pub color: bool,
    pub max_display_rows: usize,
    pub log_level: String,
}

impl Settings {
    /// Load settings from `.env`, the config file and the process environment
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case
        dotenv::dotenv().ok();
        let file = FileConfig::load_default()?;
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Resolve settings from a file config and an environment lookup
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let provider = match env("SQL_AGENT_PROVIDER").or_else(|| file.provider.clone()) {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };

        let model = env("SQL_AGENT_MODEL")
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| provider.default_model().to_string());

        let api_key = env(provider.api_key_env())
            .or_else(|| file.get_api_key(provider.name()).cloned())
            .filter(|key| !key.trim().is_empty());

        let allow_writes = match env("SQL_AGENT_ALLOW_WRITES") {
            Some(value) => parse_bool("SQL_AGENT_ALLOW_WRITES", &value)?,
            None => file.allow_writes.unwrap_or(false),
        };

        // https://no-color.org: any non-empty value disables color
        let color = env("NO_COLOR").is_none() && file.color.unwrap_or(true);

        let temperature = file.temperature.unwrap_or(0.0);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                temperature
            )));
        }

        Ok(Self {
            provider,
            model,
            api_key,
            api_base_url: env("SQL_AGENT_API_URL").or(file.api_base_url),
            database_path: env("SQL_AGENT_DB")
                .map(PathBuf::from)
                .or(file.database_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            max_tokens: file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature,
            timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            allow_writes,
            color,
            max_display_rows: file
                .max_display_rows
                .unwrap_or(DEFAULT_MAX_DISPLAY_ROWS)
                .max(1),
            log_level: env("SQL_AGENT_LOG")
                .or(file.log_level)
                .unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// The credential for the selected provider, or a descriptive error
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AgentError::MissingApiKey {
                provider: self.provider.to_string(),
                env_var: self.provider.api_key_env().to_string(),
            })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AgentError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_sources(FileConfig::default(), env_of(&[])).unwrap();
        assert_eq!(settings.provider, ProviderKind::Anthropic);
        assert_eq!(settings.model, "claude-sonnet-4-20250514");
        assert_eq!(settings.database_path, PathBuf::from("shop.db"));
        assert_eq!(settings.max_tokens, 1024);
        assert!(!settings.allow_writes);
        assert!(settings.color);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let settings = Settings::from_sources(FileConfig::default(), env_of(&[])).unwrap();
        let err = settings.require_api_key().unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { .. }));

        let settings = Settings::from_sources(
            FileConfig::default(),
            env_of(&[("ANTHROPIC_API_KEY", "   ")]),
        )
        .unwrap();
        assert!(settings.require_api_key().is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = FileConfig {
            provider: Some("anthropic".to_string()),
            database_path: Some(PathBuf::from("from-file.db")),
            ..FileConfig::default()
        };
        file.api_keys
            .insert("openai".to_string(), "sk-file".to_string());

        let settings = Settings::from_sources(
            file,
            env_of(&[
                ("SQL_AGENT_PROVIDER", "openai"),
                ("SQL_AGENT_DB", "from-env.db"),
                ("NO_COLOR", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.provider, ProviderKind::OpenAI);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.api_key.as_deref(), Some("sk-file"));
        assert_eq!(settings.database_path, PathBuf::from("from-env.db"));
        assert!(!settings.color);
    }

    #[test]
    fn test_key_lookup_follows_provider() {
        let settings = Settings::from_sources(
            FileConfig::default(),
            env_of(&[("OPENAI_API_KEY", "sk-openai")]),
        )
        .unwrap();
        // Anthropic is selected, so the OpenAI key does not count
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Settings::from_sources(
            FileConfig::default(),
            env_of(&[("SQL_AGENT_PROVIDER", "cohere")])
        )
        .is_err());
        assert!(Settings::from_sources(
            FileConfig::default(),
            env_of(&[("SQL_AGENT_ALLOW_WRITES", "maybe")])
        )
        .is_err());

        let file = FileConfig {
            temperature: Some(3.5),
            ..FileConfig::default()
        };
        assert!(Settings::from_sources(file, env_of(&[])).is_err());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!(ProviderKind::OpenAI.to_string(), "openai");
    }
}
