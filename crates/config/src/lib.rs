//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Every setting has a default, so the middleware is
//! usable with zero configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Response cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Tool selection and execution
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Context retrieval
    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Time-to-live applied when `set` is called without one
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Maximum number of sessions whose UI state is tracked
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// How long an idle session's UI state is kept
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_max_size() -> usize {
    1000
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_ttl_secs() -> u64 {
    900
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            default_ttl_secs: default_ttl_secs(),
            max_sessions: default_max_sessions(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Per-invocation timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for the whole fan-out of one request
    #[serde(default = "default_aggregate_deadline_ms")]
    pub aggregate_deadline_ms: u64,

    /// How long stragglers may run once the first tool has answered
    #[serde(default = "default_partial_grace_ms")]
    pub partial_grace_ms: u64,

    /// Minimum final score for a tool to be selected
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Maximum number of tools invoked per request
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    #[serde(default)]
    pub weights: WeightsConfig,
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_aggregate_deadline_ms() -> u64 {
    20_000
}
fn default_partial_grace_ms() -> u64 {
    2_000
}
fn default_min_score() -> f32 {
    0.3
}
fn default_max_tools() -> usize {
    3
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn aggregate_deadline(&self) -> Duration {
        Duration::from_millis(self.aggregate_deadline_ms)
    }

    pub fn partial_grace(&self) -> Duration {
        Duration::from_millis(self.partial_grace_ms)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            aggregate_deadline_ms: default_aggregate_deadline_ms(),
            partial_grace_ms: default_partial_grace_ms(),
            min_score: default_min_score(),
            max_tools: default_max_tools(),
            weights: WeightsConfig::default(),
        }
    }
}

/// Relative weights of the tool-scoring components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_lexical_weight")]
    pub lexical: f32,

    #[serde(default = "default_topical_weight")]
    pub topical: f32,

    #[serde(default = "default_metadata_weight")]
    pub metadata: f32,

    /// Score given to a tool with no matching signal at all
    #[serde(default = "default_baseline")]
    pub baseline: f32,
}

fn default_lexical_weight() -> f32 {
    0.5
}
fn default_topical_weight() -> f32 {
    0.3
}
fn default_metadata_weight() -> f32 {
    0.2
}
fn default_baseline() -> f32 {
    0.05
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            lexical: default_lexical_weight(),
            topical: default_topical_weight(),
            metadata: default_metadata_weight(),
            baseline: default_baseline(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum entries returned by the context retriever
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    10
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl ChatConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `PARLEY_CACHE_MAX_SIZE`
    /// - `PARLEY_CACHE_TTL_SECS`
    /// - `PARLEY_TOOL_TIMEOUT_MS`
    /// - `PARLEY_MIN_TOOL_SCORE`
    /// - `PARLEY_MAX_CONTEXT_ENTRIES`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
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

    /// Apply overrides from an environment-like lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PARLEY_CACHE_MAX_SIZE") {
            self.cache.max_size = parse_env("PARLEY_CACHE_MAX_SIZE", &v)?;
        }
        if let Some(v) = lookup("PARLEY_CACHE_TTL_SECS") {
            self.cache.default_ttl_secs = parse_env("PARLEY_CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("PARLEY_TOOL_TIMEOUT_MS") {
            self.tools.timeout_ms = parse_env("PARLEY_TOOL_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("PARLEY_MIN_TOOL_SCORE") {
            self.tools.min_score = parse_env("PARLEY_MIN_TOOL_SCORE", &v)?;
        }
        if let Some(v) = lookup("PARLEY_MAX_CONTEXT_ENTRIES") {
            self.context.max_entries = parse_env("PARLEY_MAX_CONTEXT_ENTRIES", &v)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_size == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_size must be > 0".into(),
            ));
        }

        if self.cache.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_sessions must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.tools.min_score) {
            return Err(ConfigError::ValidationError(
                "tools.min_score must be between 0.0 and 1.0".into(),
            ));
        }

        if self.tools.timeout_ms == 0
            || self.tools.aggregate_deadline_ms == 0
            || self.tools.partial_grace_ms == 0
        {
            return Err(ConfigError::ValidationError(
                "tool timeouts must be > 0".into(),
            ));
        }

        if self.tools.aggregate_deadline_ms >= self.tools.timeout_ms {
            tracing::warn!(
                timeout_ms = self.tools.timeout_ms,
                aggregate_deadline_ms = self.tools.aggregate_deadline_ms,
                "tools.aggregate_deadline_ms is not below tools.timeout_ms; only the per-tool timeout will apply"
            );
        }

        if self.tools.max_tools == 0 {
            return Err(ConfigError::ValidationError(
                "tools.max_tools must be > 0".into(),
            ));
        }

        let w = &self.tools.weights;
        if w.lexical < 0.0 || w.topical < 0.0 || w.metadata < 0.0 {
            return Err(ConfigError::ValidationError(
                "scoring weights must be non-negative".into(),
            ));
        }
        if w.lexical + w.topical + w.metadata <= 0.0 {
            return Err(ConfigError::ValidationError(
                "lexical + topical + metadata weights must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&w.baseline) {
            return Err(ConfigError::ValidationError(
                "weights.baseline must be in [0.0, 1.0)".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value '{value}'")))
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
}

impl From<ConfigError> for parley_core::ChatUiError {
    fn from(err: ConfigError) -> Self {
        parley_core::ChatUiError::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = ChatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache.max_sessions, 1000);
        assert_eq!(config.cache.session_ttl(), Duration::from_secs(900));
        assert_eq!(config.context.max_entries, 10);
        assert_eq!(config.tools.max_tools, 3);
    }

    #[test]
    fn default_deadlines_are_ordered() {
        let tools = ToolsConfig::default();
        assert!(tools.partial_grace() < tools.aggregate_deadline());
        assert!(tools.aggregate_deadline() < tools.timeout());
    }

    #[test]
    fn zero_grace_rejected() {
        let mut config = ChatConfig::default();
        config.tools.partial_grace_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_roundtrip_toml() {
        let toml_str = ChatConfig::default_toml();
        let parsed: ChatConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cache.max_size, 1000);
        assert_eq!(parsed.tools.timeout_ms, 30_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[cache]\nmax_size = 5\n\n[tools.weights]\nlexical = 0.9"
        )
        .unwrap();

        let config = ChatConfig::load_from(file.path()).unwrap();
        assert_eq!(config.cache.max_size, 5);
        assert_eq!(config.cache.default_ttl_secs, 3600);
        assert_eq!(config.tools.weights.lexical, 0.9);
        assert_eq!(config.tools.weights.topical, 0.3);
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache\nmax_size = ").unwrap();
        let err = ChatConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = ChatConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.cache.max_size, 1000);
    }

    #[test]
    fn invalid_min_score_rejected() {
        let mut config = ChatConfig::default();
        config.tools.min_score = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_weights_rejected() {
        let mut config = ChatConfig::default();
        config.tools.weights = WeightsConfig {
            lexical: 0.0,
            topical: 0.0,
            metadata: 0.0,
            baseline: 0.05,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PARLEY_CACHE_MAX_SIZE", "42"),
            ("PARLEY_MIN_TOOL_SCORE", "0.5"),
            ("PARLEY_MAX_CONTEXT_ENTRIES", "3"),
        ]);
        let mut config = ChatConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.cache.max_size, 42);
        assert_eq!(config.tools.min_score, 0.5);
        assert_eq!(config.context.max_entries, 3);
        assert_eq!(config.tools.timeout_ms, 30_000);
    }

    #[test]
    fn bad_env_value_rejected() {
        let mut config = ChatConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "PARLEY_CACHE_TTL_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PARLEY_CACHE_TTL_SECS"));
    }
}
