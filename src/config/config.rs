//! Configuration management for tokensync

use crate::error::{Result, SyncError};
use crate::oauth::PlaceholderMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Management API server configuration
    pub server: ServerConfig,
    /// Outbound HTTP client used to call token endpoints
    pub http_client: HttpClientConfig,
    /// Placeholder substitution settings
    pub template: TemplateConfig,
    /// Background refresh job settings
    pub refresh: RefreshConfig,
    /// Configuration record storage
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
        }
    }
}

/// Outbound HTTP client configuration.
///
/// One client is built from this and shared by every validation and refresh call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Skip certificate chain and hostname verification of token endpoints
    pub insecure_tls: bool,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent sent with every token request
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            insecure_tls: true,
            timeout_seconds: 15,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Placeholder substitution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Replace only the first `{time}` occurrence or all of them
    pub placeholder_mode: PlaceholderMode,
}

/// Background refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Run refresh jobs at all; when false, save still persists but schedules nothing
    pub enabled: bool,
    /// Refresh period for configurations without `token_valid_hour`
    pub default_interval_seconds: u64,
    /// Reschedule every open configuration found in storage at startup
    pub schedule_on_startup: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_interval_seconds: 3600,
            schedule_on_startup: true,
        }
    }
}

impl RefreshConfig {
    /// Get default refresh interval as Duration
    pub fn default_interval(&self) -> Duration {
        Duration::from_secs(self.default_interval_seconds)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file; records are kept in memory only when unset
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SyncError::config("Server host cannot be empty"));
        }
        if self.port == 0 {
            return Err(SyncError::config("Server port cannot be 0"));
        }
        Ok(())
    }
}

impl Config {
    /// Load .env files in order of precedence
    fn load_env_files() {
        let env = std::env::var("TOKENSYNC_ENV")
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let env_specific_file = format!(".env.{}", env);
        let env_files = [".env", env_specific_file.as_str(), ".env.local"];

        for env_file in env_files {
            match dotenvy::from_filename(env_file) {
                Ok(_) => {
                    tracing::info!("Loaded environment variables from {}", env_file);
                }
                Err(e) if e.not_found() => {
                    tracing::debug!("No {} file found, skipping", env_file);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", env_file, e);
                }
            }
        }
    }

    /// Load configuration from file with environment variables and CLI overrides
    pub fn load<P: AsRef<Path>>(
        path: P,
        host_override: Option<String>,
        port_override: Option<u16>,
    ) -> Result<Self> {
        // .env → .env.{environment} → .env.local
        Self::load_env_files();

        let mut config = if path.as_ref().exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                SyncError::config(format!("Failed to read config file: {}", e))
            })?;
            Self::from_yaml(&content)?
        } else {
            tracing::warn!("Config file {:?} not found, using defaults", path.as_ref());
            Self::default()
        };

        // Precedence: .env < file < env < CLI
        config.apply_environment_overrides()?;

        if let Some(host) = host_override {
            config.server.host = host;
        }
        if let Some(port) = port_override {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SyncError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("TOKENSYNC_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }

        if let Ok(port_str) = std::env::var("TOKENSYNC_PORT") {
            if !port_str.is_empty() {
                self.server.port = port_str.parse().map_err(|e| {
                    SyncError::config(format!("Invalid TOKENSYNC_PORT environment variable: {}", e))
                })?;
            }
        }

        if let Ok(insecure_str) = std::env::var("TOKENSYNC_INSECURE_TLS") {
            if !insecure_str.is_empty() {
                self.http_client.insecure_tls = insecure_str.parse().map_err(|e| {
                    SyncError::config(format!("Invalid TOKENSYNC_INSECURE_TLS environment variable: {}", e))
                })?;
            }
        }

        if let Ok(timeout_str) = std::env::var("TOKENSYNC_HTTP_TIMEOUT") {
            if !timeout_str.is_empty() {
                self.http_client.timeout_seconds = timeout_str.parse().map_err(|e| {
                    SyncError::config(format!("Invalid TOKENSYNC_HTTP_TIMEOUT environment variable: {}", e))
                })?;
            }
        }

        if let Ok(storage_path) = std::env::var("TOKENSYNC_STORAGE_PATH") {
            if !storage_path.is_empty() {
                self.storage.path = Some(PathBuf::from(storage_path));
            }
        }

        if let Ok(log_level) = std::env::var("TOKENSYNC_LOG_LEVEL") {
            if !log_level.is_empty() {
                self.logging.level = log_level;
            }
        }

        if let Ok(log_format) = std::env::var("TOKENSYNC_LOG_FORMAT") {
            if !log_format.is_empty() {
                self.logging.format = log_format;
            }
        }

        Ok(())
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;

        if self.http_client.timeout_seconds == 0 {
            return Err(SyncError::config("HTTP client timeout must be greater than 0"));
        }
        if self.refresh.default_interval_seconds == 0 {
            return Err(SyncError::config("Refresh interval must be greater than 0"));
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            other => {
                return Err(SyncError::config(format!(
                    "Invalid log format: {}. Supported formats: json, text",
                    other
                )));
            }
        }

        Ok(())
    }
}
