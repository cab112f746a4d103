//! Configuration loading, validation, and management for AgriSense.
//!
//! Loads configuration from `~/.agrisense/config.toml` with environment
//! variable overrides for secrets. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agrisense/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Sensor device settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Image search provider settings
    #[serde(default)]
    pub images: ImagesConfig,

    /// Storage settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Payload for the version-check endpoint
    #[serde(default)]
    pub version: VersionConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("device", &self.device)
            .field("provider", &self.provider)
            .field("images", &self.images)
            .field("database", &self.database)
            .field("version", &self.version)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// URL the device serves its current readings from.
    #[serde(default = "default_device_url")]
    pub url: String,
}

fn default_device_url() -> String {
    "http://192.168.43.153/dht".into()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            url: default_device_url(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible completion endpoint.
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Model identifier sent in the completion payload.
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token. Usually supplied via environment instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_provider_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            model: default_model(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Client-ID key for the image search provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
}

impl std::fmt::Debug for ImagesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagesConfig")
            .field("access_key", &redact(&self.access_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path. `sqlite::memory:` gives an ephemeral database.
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    AppConfig::config_dir()
        .join("agrisense.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    #[serde(default = "default_latest_version")]
    pub latest: String,

    #[serde(default = "default_download_url")]
    pub download_url: String,
}

fn default_latest_version() -> String {
    "1.2.0".into()
}
fn default_download_url() -> String {
    "https://yourserver.com/MyAppSetup.exe".into()
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            latest: default_latest_version(),
            download_url: default_download_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.agrisense/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `AGRISENSE_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `API_KEY`
    /// - `UNSPLASH_ACCESS_KEY` for the image search provider
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("AGRISENSE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("API_KEY").ok());
        }

        if config.images.access_key.is_none() {
            config.images.access_key = std::env::var("UNSPLASH_ACCESS_KEY").ok();
        }

        if let Ok(model) = std::env::var("AGRISENSE_MODEL") {
            config.provider.model = model;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agrisense")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".into(),
            ));
        }

        if !self.device.url.starts_with("http://") && !self.device.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "device.url must be an http(s) URL".into(),
            ));
        }

        if self.provider.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.base_url must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if a provider API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            device: DeviceConfig::default(),
            provider: ProviderConfig::default(),
            images: ImagesConfig::default(),
            database: DatabaseConfig::default(),
            version: VersionConfig::default(),
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.device.url.contains("/dht"));
        assert!(config.provider.base_url.contains("openrouter.ai"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.provider.model, config.provider.model);
    }

    #[test]
    fn zero_port_rejected() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_device_url_rejected() {
        let config = AppConfig {
            device: DeviceConfig {
                url: "ftp://device.local".into(),
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().server.port, 8080);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[server]
port = 9090

[provider]
model = "anthropic/claude-sonnet-4"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.provider.model, "anthropic/claude-sonnet-4");
        assert!(config.device.url.contains("/dht"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("8080"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn config_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[device]
url = "http://10.0.0.7/dht"

[version]
latest = "2.0.0"
download_url = "https://example.com/app.exe"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.device.url, "http://10.0.0.7/dht");
        assert_eq!(config.version.latest, "2.0.0");
    }
}
