//! Error handling module for tokensync

mod error;

// Re-export the main error types and utilities
pub use error::{
    Result, SyncError, ERRCODE_GENERIC, ERRCODE_MISSING_IDENTIFIER, TOKEN_PATH_INCORRECT,
};
