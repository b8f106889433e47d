//! Configuration loading, validation, and management for Quarry.
//!
//! Loads configuration from `~/.quarry/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the model backend key.
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
/// Environment variable holding the search backend key.
pub const SERPER_KEY_VAR: &str = "SERPER_API_KEY";

/// The root configuration structure.
///
/// Maps directly to `~/.quarry/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model identifier sent to the backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum reason/act steps per question
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Model backend settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Search backend settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Page fetch and extraction settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_model() -> String {
    "claude-opus-4-5-20251101".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_steps() -> u32 {
    10
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_steps", &self.max_steps)
            .field("anthropic", &self.anthropic)
            .field("search", &self.search)
            .field("fetch", &self.fetch)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_url")]
    pub base_url: String,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_backend_timeout() -> u64 {
    120
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Results requested when the model does not say
    #[serde(default = "default_results")]
    pub default_results: u32,

    /// Soft cap applied before calling the search backend
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_results() -> u32 {
    5
}
fn default_max_results() -> u32 {
    10
}
fn default_search_timeout() -> u64 {
    15
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            default_results: default_results(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("default_results", &self.default_results)
            .field("max_results", &self.max_results)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Character budget for extracted page text
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_max_chars() -> usize {
    3000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_chars: default_max_chars(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quarry/config.toml).
    ///
    /// Environment variables override the file:
    /// - `ANTHROPIC_API_KEY`, `SERPER_API_KEY`
    /// - `QUARRY_MODEL`, `QUARRY_MAX_STEPS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Credentials from the environment win over the file; empty values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ANTHROPIC_KEY_VAR) {
            self.anthropic.api_key = Some(key);
        }
        if let Some(key) = non_empty(SERPER_KEY_VAR) {
            self.search.api_key = Some(key);
        }
        if let Some(model) = non_empty("QUARRY_MODEL") {
            self.model = model;
        }
        if let Some(steps) = non_empty("QUARRY_MAX_STEPS") {
            match steps.trim().parse() {
                Ok(n) => self.max_steps = n,
                Err(_) => tracing::warn!(value = %steps, "Ignoring non-numeric QUARRY_MAX_STEPS"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quarry")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "max_steps must be at least 1".into(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be at least 1".into(),
            ));
        }
        if self.fetch.max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_chars must be greater than 0".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 || self.search.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Both backend credentials must be present before serving requests.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.anthropic.api_key.is_none() {
            missing.push(ANTHROPIC_KEY_VAR.to_string());
        }
        if self.search.api_key.is_none() {
            missing.push(SERPER_KEY_VAR.to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials(missing))
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_steps: default_max_steps(),
            anthropic: AnthropicConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.fetch.max_chars, 3000);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.search.default_results, 5);
        assert_eq!(config.search.max_results, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.search.endpoint, config.search.endpoint);
    }

    #[test]
    fn zero_steps_rejected() {
        let config = AppConfig {
            max_steps: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().max_steps, 10);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
max_steps = 4

[fetch]
max_chars = 1200
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.max_steps, 4);
        assert_eq!(config.fetch.max_chars, 1200);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.search.max_results, 10);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_steps = \"many\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_credentials_and_model() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            (ANTHROPIC_KEY_VAR, "sk-ant-test"),
            (SERPER_KEY_VAR, "serper-test"),
            ("QUARRY_MODEL", "claude-test"),
            ("QUARRY_MAX_STEPS", "3"),
        ]));
        assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(config.search.api_key.as_deref(), Some("serper-test"));
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.max_steps, 3);
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(ANTHROPIC_KEY_VAR, "  "), ("QUARRY_MAX_STEPS", "lots")]));
        assert!(config.anthropic.api_key.is_none());
        assert_eq!(config.max_steps, 10);
    }

    #[test]
    fn require_credentials_lists_every_missing_key() {
        let config = AppConfig::default();
        match config.require_credentials() {
            Err(ConfigError::MissingCredentials(missing)) => {
                assert_eq!(missing, vec![ANTHROPIC_KEY_VAR, SERPER_KEY_VAR]);
            }
            other => panic!("expected missing credentials, got {other:?}"),
        }

        let mut config = AppConfig::default();
        config.apply_env(env(&[(ANTHROPIC_KEY_VAR, "a"), (SERPER_KEY_VAR, "b")]));
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(ANTHROPIC_KEY_VAR, "sk-ant-secret")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("google.serper.dev"));
        assert!(toml_str.contains("max_chars = 3000"));
    }
}
