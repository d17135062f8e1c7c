use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main troupe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub backend: BackendConfig,
    pub retry: RetryConfig,
    pub sanitizer: SanitizerConfig,
    /// Minimum word count for a cleaned response to be accepted
    pub min_words: usize,
}

/// Log verbosity, overridden by RUST_LOG when set
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Generative backend endpoint and sampling parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

/// Bounded retry with two fixed backoff tiers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Pause after a response that was too short once cleaned
    pub validation_backoff_ms: u64,
    /// Pause after a timeout, bad status or transport error
    pub failure_backoff_ms: u64,
}

/// Tuning constants for response sanitization
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Raw text shorter than this (trimmed) is replaced by the silence placeholder
    pub min_chars: usize,
    /// Word count above which the response gets truncated
    pub max_words: usize,
    /// Word index where truncation starts looking for a sentence end
    pub cut_words: usize,
}

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "phi3".to_string(),
            timeout_secs: 45,
            temperature: 0.8,
            top_p: 0.9,
            num_predict: 250,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            validation_backoff_ms: 1000,
            failure_backoff_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// No pauses between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            validation_backoff_ms: 0,
            failure_backoff_ms: 0,
        }
    }

    pub fn validation_backoff(&self) -> Duration {
        Duration::from_millis(self.validation_backoff_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            min_chars: 10,
            max_words: 300,
            cut_words: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            backend: BackendConfig::default(),
            retry: RetryConfig::default(),
            sanitizer: SanitizerConfig::default(),
            min_words: 15,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load; everything after it is best effort
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        match Self::load_first(&Self::candidate_paths()) {
            Some(config) => Ok(config),
            None => {
                log::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// TROUPE_CONFIG, TROUPE_DIR/troupe.yaml, ~/.config/troupe/troupe.yaml, ./troupe.yaml
    fn candidate_paths() -> Vec<(&'static str, PathBuf)> {
        let mut candidates = Vec::new();

        if let Ok(env_path) = std::env::var("TROUPE_CONFIG") {
            candidates.push(("TROUPE_CONFIG", PathBuf::from(env_path)));
        }
        if let Ok(troupe_dir) = std::env::var("TROUPE_DIR") {
            candidates.push(("TROUPE_DIR", PathBuf::from(troupe_dir).join("troupe.yaml")));
        }
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(("user config dir", config_dir.join("troupe").join("troupe.yaml")));
        }
        candidates.push(("working directory", PathBuf::from("troupe.yaml")));

        candidates
    }

    /// First candidate that exists and parses; broken files are logged and skipped
    fn load_first(candidates: &[(&str, PathBuf)]) -> Option<Self> {
        for (source, path) in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(config) => return Some(config),
                Err(e) => log::warn!("Failed to load config from {} ({}): {:#}", source, path.display(), e),
            }
        }
        None
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_words, 15);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.backend.model, "phi3");
        assert_eq!(config.backend.timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_default_sanitizer_config() {
        let config = SanitizerConfig::default();
        assert_eq!(config.min_chars, 10);
        assert_eq!(config.max_words, 300);
        assert_eq!(config.cut_words, 250);
    }

    #[test]
    fn test_retry_backoff_tiers() {
        let retry = RetryConfig::default();
        assert!(retry.validation_backoff() < retry.failure_backoff());

        let immediate = RetryConfig::immediate(3);
        assert_eq!(immediate.max_attempts, 3);
        assert_eq!(immediate.failure_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "backend:\n  model: llama3\nretry:\n  max_attempts: 4\n";
        let config: Config = serde_yaml::from_str(yaml).expect("Failed to parse");
        assert_eq!(config.backend.model, "llama3");
        assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.failure_backoff_ms, 2000);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_load_from_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("troupe.yaml");
        fs::write(&path, "log_level: debug\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.min_words, 15);
    }

    #[test]
    fn test_load_first_skips_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.yaml");
        let good = dir.path().join("good.yaml");
        let later = dir.path().join("later.yaml");
        fs::write(&broken, "min_words: [not, a, number]\n").unwrap();
        fs::write(&good, "min_words: 7\n").unwrap();
        fs::write(&later, "min_words: 9\n").unwrap();

        let candidates = vec![
            ("TROUPE_CONFIG", dir.path().join("missing.yaml")),
            ("TROUPE_DIR", broken),
            ("user config dir", good),
            ("working directory", later),
        ];
        let config = Config::load_first(&candidates).unwrap();
        assert_eq!(config.min_words, 7);
    }

    #[test]
    fn test_load_first_none_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![("TROUPE_CONFIG", dir.path().join("missing.yaml"))];
        assert!(Config::load_first(&candidates).is_none());
    }

    #[test]
    fn test_candidate_paths_order() {
        let candidates = Config::candidate_paths();
        let (source, path) = candidates.last().unwrap();
        assert_eq!(*source, "working directory");
        assert_eq!(path, &PathBuf::from("troupe.yaml"));
    }

    #[test]
    fn test_log_level_to_filter() {
        assert_eq!(log::LevelFilter::from(LogLevel::Debug), log::LevelFilter::Debug);
        assert_eq!(log::LevelFilter::from(LogLevel::Off), log::LevelFilter::Off);
        assert_eq!(log::LevelFilter::from(LogLevel::default()), log::LevelFilter::Info);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/troupe.yaml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/share/scenes.yaml");
        let expanded = Config::expand_path(&path);
        assert_eq!(expanded, path);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/scenes.yaml");
        let expanded = Config::expand_path(&path);
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("scenes.yaml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.min_words, config.min_words);
        assert_eq!(parsed.backend.endpoint, config.backend.endpoint);
    }
}
