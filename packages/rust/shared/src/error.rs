//! Error types for DealScout.
//!
//! Library crates use [`DealScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all DealScout operations.
#[derive(Debug, thiserror::Error)]
pub enum DealScoutError {
    /// Missing or invalid configuration. Fatal at startup, never per-document.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transient collaborator failure: connect error, timeout, 5xx, rejected request.
    #[error("network error: {0}")]
    Network(String),

    /// Unparsable model output or unexpected document/response shape.
    #[error("malformed response: {message}")]
    Malformed { message: String },

    /// The document does not satisfy the processing policy (e.g. no founder name).
    #[error("policy violation: {message}")]
    Policy { message: String },

    /// Ledger / state file error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input file, invalid id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Document format conversion error (Word export → HTML).
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DealScoutError>;

impl DealScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-response error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed {
            message: msg.into(),
        }
    }

    /// Create a policy violation from any displayable message.
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Only configuration errors stop the process; everything else is scoped
    /// to a single document or cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
