//! JSON Output Envelope Types
//!
//! This module defines the structured JSON output format for all sqlporter
//! operations. All operations return either a SuccessEnvelope or an
//! ErrorEnvelope.
//!
//! # Output Contract
//! - Success: `{"ok": true, "profile": "...", "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "profile": "...", "command": "...", "error": {"code": "...", "message": "..."}}`
//!
//! Output is stable and suitable for programmatic parsing.

use serde::{Deserialize, Serialize};

use crate::error::SqlPorterError;

/// Success envelope for operation results
///
/// Generic over the data type to support different operation return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Connection profile the operation ran against (empty if not applicable)
    pub profile: String,

    /// Command that was executed (exec, export, import-sql, import-csv, ...)
    pub command: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(
        profile: impl Into<String>,
        command: impl Into<String>,
        data: T,
        meta: Metadata,
    ) -> Self {
        Self { ok: true, profile: profile.into(), command: command.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Connection profile (empty string if not profile-specific)
    pub profile: String,

    /// Command that was attempted
    pub command: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(profile: impl Into<String>, command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, profile: profile.into(), command: command.into(), error }
    }

    /// Create error envelope from SqlPorterError
    pub fn from_error(
        profile: impl Into<String>,
        command: impl Into<String>,
        err: &SqlPorterError,
    ) -> Self {
        Self::new(
            profile,
            command,
            ErrorInfo { code: err.error_code().to_string(), message: err.message() },
        )
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "EXECUTION_FAILED", "BATCH_FAILED")
    pub code: String,

    /// Human-readable error message (no credentials or file paths)
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error info
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned or applied (None for row-less operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl Metadata {
    /// Create new metadata with just execution time
    pub fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows: None }
    }

    /// Create new metadata with execution time and row count
    pub fn with_rows(execution_ms: u64, rows: usize) -> Self {
        Self { execution_ms, rows: Some(rows) }
    }
}
