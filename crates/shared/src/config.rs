//! Configuration management for flashynime.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Upstream API settings
    pub api: ApiConfig,

    /// Fetch cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// App state persistence settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Upstream origin, without trailing slash
    pub base_url: String,

    /// Per-candidate timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Proxies tried in order before the direct URL
    pub proxies: Vec<ProxyConfig>,

    /// Whether the direct URL is tried after the proxies
    #[serde(default = "default_true")]
    pub try_direct: bool,
}

/// How a proxy expects the target URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStyle {
    /// Target URL percent-encoded into the query string
    Query,
    /// Target URL appended to the proxy path as-is
    Path,
}

/// A single CORS proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Name used in logs
    pub name: String,

    /// Request encoding convention
    pub style: ProxyStyle,

    /// URL prefix the target is attached to
    pub prefix: String,
}

impl ProxyConfig {
    fn new(name: &str, style: ProxyStyle, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            style,
            prefix: prefix.to_string(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

/// Fetch cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the fetch cache
    pub enabled: bool,

    /// Storage backend
    pub backend: StorageBackend,

    /// Cache directory or database file (relative to data directory)
    pub path: String,

    /// Prefix prepended to every endpoint key
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: StorageBackend::File,
            path: "cache".to_string(),
            key_prefix: "flashynime_cache_".to_string(),
        }
    }
}

/// App state persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage backend
    pub backend: StorageBackend,

    /// Store directory or database file (relative to data directory)
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: "state.db".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.sankavollerei.com".to_string(),
            timeout_secs: 20,
            user_agent: "flashynime/0.1.0".to_string(),
            proxies: vec![
                ProxyConfig::new("corsproxy", ProxyStyle::Query, "https://corsproxy.io/?url="),
                ProxyConfig::new("allorigins", ProxyStyle::Query, "https://api.allorigins.win/get?url="),
                ProxyConfig::new("codetabs", ProxyStyle::Query, "https://api.codetabs.com/v1/proxy?quest="),
                ProxyConfig::new("thingproxy", ProxyStyle::Path, "https://thingproxy.freeboard.io/fetch/"),
            ],
            try_direct: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    /// Get the path for the fetch cache
    pub fn cache_path(&self) -> PathBuf {
        self.resolve(&self.cache.path)
    }

    /// Get the path for the app state store
    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store.path)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.api.timeout_secs, 20);
        assert_eq!(config.api.proxies.len(), 4);
        assert_eq!(config.api.proxies[3].style, ProxyStyle::Path);
        assert!(config.api.try_direct);
        assert_eq!(config.cache.backend, StorageBackend::File);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config::default();
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(loaded_config.api.base_url, original_config.api.base_url);
        assert_eq!(loaded_config.api.proxies, original_config.api.proxies);

        Ok(())
    }

    #[test]
    fn test_partial_config_uses_section_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[data]
root_dir = "/var/lib/flashynime"

[logging]
log_dir = "logs"
default_level = "debug"
console = true
file = false
json_format = false

[api]
base_url = "https://example.org"
timeout_secs = 5
user_agent = "test"

[[api.proxies]]
name = "only"
style = "path"
prefix = "https://proxy.example/"
"#,
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.api.proxies.len(), 1);
        assert!(config.api.try_direct);
        assert_eq!(config.store.backend, StorageBackend::Sqlite);
        assert_eq!(config.store_path(), PathBuf::from("/var/lib/flashynime/state.db"));
        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        assert!(config.log_dir().ends_with("data/logs"));
        assert!(config.cache_path().ends_with("data/cache"));
        assert!(config.store_path().ends_with("data/state.db"));
    }
}
