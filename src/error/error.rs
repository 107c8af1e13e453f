//! Error types and handling for tokensync

use thiserror::Error;

/// Result type alias for tokensync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Message surfaced to callers when a token endpoint answers with a non-success status
pub const TOKEN_PATH_INCORRECT: &str = "token path incorrect";

/// Error code for a request missing `project_id` or `env_id`
pub const ERRCODE_MISSING_IDENTIFIER: i32 = 408;

/// Error code for every other failure surfaced by the management API
pub const ERRCODE_GENERIC: i32 = 402;

/// Main error type for tokensync
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required identifier was absent on save/get/list
    #[error("{message}")]
    MissingIdentifier { field: &'static str, message: String },

    /// Transport-level failure reaching the configured token URL
    #[error("Token endpoint unreachable: {message}")]
    EndpointUnreachable { message: String },

    /// Endpoint reachable but answered with a non-success status
    #[error("{message}")]
    BadTokenEndpoint { message: String },

    /// Persistence errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Refresh job scheduling errors
    #[error("Scheduler error: {message}")]
    Scheduler { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Create a missing-identifier error for the given field
    pub fn missing_identifier(field: &'static str) -> Self {
        let message = match field {
            "project_id" => "missing project id".to_string(),
            "env_id" => "missing environment id".to_string(),
            other => format!("missing {}", other),
        };
        Self::MissingIdentifier { field, message }
    }

    /// Create an endpoint-unreachable error
    pub fn endpoint_unreachable<S: Into<String>>(message: S) -> Self {
        Self::EndpointUnreachable {
            message: message.into(),
        }
    }

    /// Create the generic bad-token-endpoint error
    pub fn bad_token_endpoint() -> Self {
        Self::BadTokenEndpoint {
            message: TOKEN_PATH_INCORRECT.to_string(),
        }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a scheduler error
    pub fn scheduler<S: Into<String>>(message: S) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is a validation verdict rather than an internal failure
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            SyncError::EndpointUnreachable { .. } | SyncError::BadTokenEndpoint { .. }
        )
    }

    /// Error code carried in the management API envelope
    pub fn errcode(&self) -> i32 {
        match self {
            SyncError::MissingIdentifier { .. } => ERRCODE_MISSING_IDENTIFIER,
            _ => ERRCODE_GENERIC,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::MissingIdentifier { .. } => "missing_identifier",
            SyncError::EndpointUnreachable { .. } => "endpoint_unreachable",
            SyncError::BadTokenEndpoint { .. } => "bad_token_endpoint",
            SyncError::Storage { .. } => "storage",
            SyncError::Scheduler { .. } => "scheduler",
            SyncError::Config { .. } => "config",
            SyncError::Io(_) => "io",
            SyncError::Serde(_) => "serialization",
            SyncError::Yaml(_) => "yaml",
            SyncError::Http(_) => "http",
            SyncError::Internal(_) => "internal",
        }
    }
}

impl Clone for SyncError {
    fn clone(&self) -> Self {
        match self {
            SyncError::MissingIdentifier { field, message } => SyncError::MissingIdentifier {
                field: *field,
                message: message.clone(),
            },
            SyncError::EndpointUnreachable { message } => SyncError::EndpointUnreachable { message: message.clone() },
            SyncError::BadTokenEndpoint { message } => SyncError::BadTokenEndpoint { message: message.clone() },
            SyncError::Storage { message } => SyncError::Storage { message: message.clone() },
            SyncError::Scheduler { message } => SyncError::Scheduler { message: message.clone() },
            SyncError::Config { message } => SyncError::Config { message: message.clone() },

            // For non-cloneable types, convert to string representation
            SyncError::Io(e) => SyncError::storage(format!("IO error: {}", e)),
            SyncError::Serde(e) => SyncError::storage(format!("Serialization error: {}", e)),
            SyncError::Yaml(e) => SyncError::config(format!("YAML error: {}", e)),
            SyncError::Http(e) => SyncError::endpoint_unreachable(e.to_string()),
            SyncError::Internal(e) => SyncError::Internal(anyhow::anyhow!("{}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_identifier_messages() {
        let err = SyncError::missing_identifier("project_id");
        assert_eq!(err.to_string(), "missing project id");
        assert_eq!(err.errcode(), 408);

        let err = SyncError::missing_identifier("env_id");
        assert_eq!(err.to_string(), "missing environment id");
        assert_eq!(err.category(), "missing_identifier");
    }

    #[test]
    fn test_bad_token_endpoint_is_generic() {
        let err = SyncError::bad_token_endpoint();
        assert_eq!(err.to_string(), TOKEN_PATH_INCORRECT);
        assert_eq!(err.errcode(), 402);
        assert!(err.is_validation_failure());
    }

    #[test]
    fn test_storage_error_is_not_a_verdict() {
        let err = SyncError::storage("disk full");
        assert!(!err.is_validation_failure());
        assert_eq!(err.errcode(), 402);
        assert_eq!(err.clone().to_string(), "Storage error: disk full");
    }
}
