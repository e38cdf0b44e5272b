//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout sqlporter.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `ConnectionFailed`: cannot reach or authenticate to the database
//! - `MalformedStatement`: empty or unusable SQL text, rejected before connecting
//! - `ExecutionFailed`: driver-reported error during execution
//! - `SchemaMismatch`: target table/column absent or field count mismatch on import
//! - `UnsupportedFormat`: export/import format outside {csv, insert_sql}
//! - `BatchFailed`: one statement or record of an atomic batch failed (whole batch rolled back)
//! - `InvalidInput`: malformed input or missing required parameters
//! - `ConfigError`: profile store file errors

use thiserror::Error;

/// Main error type for sqlporter operations
#[derive(Error, Debug)]
pub enum SqlPorterError {
    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Empty or unusable SQL text, rejected before a connection is opened
    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    /// Driver-reported execution error; the open transaction was rolled back
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Import target table/column absent or field count mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Export/import format outside the supported set
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A statement or record inside an atomic batch failed.
    /// The index is 0-based; every effect of the batch was rolled back.
    #[error("Batch failed at index {index}: {detail}")]
    BatchFailed { index: usize, detail: String },

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Profile store error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SqlPorterError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::MalformedStatement(_) => "MALFORMED_STATEMENT",
            Self::ExecutionFailed(_) => "EXECUTION_FAILED",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::BatchFailed { .. } => "BATCH_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Get human-readable error message (no credentials, safe for JSON output)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a malformed statement error
    pub fn malformed_statement(message: impl Into<String>) -> Self {
        Self::MalformedStatement(message.into())
    }

    /// Create an execution failed error
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    /// Create an unsupported format error
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    /// Create a batch failure pinned to a 0-based index
    pub fn batch_failed(index: usize, detail: impl Into<String>) -> Self {
        Self::BatchFailed { index, detail: detail.into() }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for sqlporter operations
pub type Result<T> = std::result::Result<T, SqlPorterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SqlPorterError::connection_failed("test").error_code(), "CONNECTION_FAILED");
        assert_eq!(SqlPorterError::malformed_statement("test").error_code(), "MALFORMED_STATEMENT");
        assert_eq!(SqlPorterError::execution_failed("test").error_code(), "EXECUTION_FAILED");
        assert_eq!(SqlPorterError::schema_mismatch("test").error_code(), "SCHEMA_MISMATCH");
        assert_eq!(SqlPorterError::unsupported_format("test").error_code(), "UNSUPPORTED_FORMAT");
        assert_eq!(SqlPorterError::batch_failed(1, "test").error_code(), "BATCH_FAILED");
        assert_eq!(SqlPorterError::invalid_input("test").error_code(), "INVALID_INPUT");
        assert_eq!(SqlPorterError::config_error("test").error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_batch_failed_carries_index() {
        let err = SqlPorterError::batch_failed(1, "Duplicate entry '7' for key 'PRIMARY'");
        assert!(err.message().contains("index 1"));
        assert!(err.message().contains("Duplicate entry"));
        assert!(matches!(err, SqlPorterError::BatchFailed { index: 1, .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = SqlPorterError::execution_failed("Unknown column 'x' in 'field list'");
        assert!(err.message().contains("Unknown column 'x'"));

        let err = SqlPorterError::unsupported_format("xml");
        assert!(err.message().contains("xml"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            SqlPorterError::connection_failed("test"),
            SqlPorterError::ConnectionFailed(_)
        ));
        assert!(matches!(
            SqlPorterError::malformed_statement("test"),
            SqlPorterError::MalformedStatement(_)
        ));
        assert!(matches!(
            SqlPorterError::schema_mismatch("test"),
            SqlPorterError::SchemaMismatch(_)
        ));
        assert!(matches!(
            SqlPorterError::config_error("test"),
            SqlPorterError::ConfigError(_)
        ));
    }
}
