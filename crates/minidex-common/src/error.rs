//! Error types for minidex.

use thiserror::Error;

/// Result type alias using MinidexError.
pub type Result<T> = std::result::Result<T, MinidexError>;

/// Errors that can occur in minidex operations.
///
/// Tree operations signal "not found" through `Option` return values rather
/// than errors; the variants here cover configuration validation and
/// integrity diagnostics.
#[derive(Debug, Error)]
pub enum MinidexError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },

    // B-tree errors
    #[error("B-tree corrupted: {0}")]
    TreeCorrupted(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
