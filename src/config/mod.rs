//! Configuration module for tokensync
//!
//! This module provides configuration management and loading utilities.

mod config;

// Re-export the main configuration types
pub use config::{
    Config, HttpClientConfig, LoggingConfig, RefreshConfig, ServerConfig, StorageConfig,
    TemplateConfig,
};
