//! Tokensync - OAuth2 token endpoint configuration and refresh service
//!
//! Stores per-project, per-environment descriptions of how to call an OAuth2
//! token endpoint, validates them on demand, and keeps enabled configurations
//! refreshed on a background schedule.

pub mod config;
pub mod error;
pub mod oauth;
pub mod web;

pub use config::Config;
pub use error::{Result, SyncError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 3001;
