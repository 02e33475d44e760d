//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/notedoc/config.toml)
//! 3. Environment variables (NOTEDOC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::DEFAULT_BATCH_SIZE;

/// Environment variable prefix
const ENV_PREFIX: &str = "NOTEDOC";

/// Default per-operation deadline in seconds
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Deadline applied to every repository operation
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Documents fetched per cursor batch
    #[serde(default = "default_cursor_batch_size")]
    pub cursor_batch_size: usize,

    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            operation_timeout_secs: default_operation_timeout_secs(),
            cursor_batch_size: default_cursor_batch_size(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_OPERATION_TIMEOUT_SECS", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse() {
                self.operation_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_CURSOR_BATCH_SIZE", ENV_PREFIX)) {
            if let Ok(size) = val.trim().parse() {
                self.cursor_batch_size = size;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with NOTEDOC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notedoc")
            .join("config.toml")
    }

    /// Get the path to the store file
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("notes.automerge")
    }

    /// Deadline applied to each repository operation
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs.max(1))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notedoc")
}

fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

fn default_cursor_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "NOTEDOC_DATA_DIR",
        "NOTEDOC_OPERATION_TIMEOUT_SECS",
        "NOTEDOC_CURSOR_BATCH_SIZE",
        "NOTEDOC_LOG_LEVEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.operation_timeout_secs, 10);
        assert_eq!(config.operation_timeout(), Duration::from_secs(10));
        assert_eq!(config.cursor_batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("notedoc"));
    }

    #[test]
    fn test_store_path() {
        let config = Config::default();
        assert!(config.store_path().ends_with("notes.automerge"));
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = Config {
            operation_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.operation_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("NOTEDOC_DATA_DIR", "/tmp/notedoc-test");
        env::set_var("NOTEDOC_OPERATION_TIMEOUT_SECS", "3");
        env::set_var("NOTEDOC_CURSOR_BATCH_SIZE", "8");
        env::set_var("NOTEDOC_LOG_LEVEL", "debug");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/notedoc-test"));
        assert_eq!(config.operation_timeout_secs, 3);
        assert_eq!(config.cursor_batch_size, 8);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_env_numbers_are_ignored() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("NOTEDOC_OPERATION_TIMEOUT_SECS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.operation_timeout_secs, 10);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            operation_timeout_secs = 30
            log_file = "/var/log/notedoc.log"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.operation_timeout_secs, 30);
        assert_eq!(config.cursor_batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/notedoc.log")));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            operation_timeout_secs: 5,
            cursor_batch_size: 16,
            log_level: "warn".to_string(),
            log_file: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("NOTEDOC_DATA_DIR", temp_dir.path().join("data"));

        let config = Config::load_from_path(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.operation_timeout_secs, 10);
        assert!(config.data_dir.exists());
    }
}
