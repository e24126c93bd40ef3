//! Error types for tubekeeper.
//!
//! Library crates use [`TubekeeperError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all tubekeeper operations.
#[derive(Debug, thiserror::Error)]
pub enum TubekeeperError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The requested video or channel does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A remote API call failed.
    #[error("source error: {0}")]
    Source(String),

    /// A remote API call was rejected because the quota is used up.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Access token could not be obtained or refreshed.
    #[error("auth error: {0}")]
    Auth(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A fetched video is missing fields required for processing.
    #[error("malformed record: {message}")]
    MalformedRecord { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad marker, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TubekeeperError>;

impl TubekeeperError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a not-found error naming the missing thing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a malformed-record error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord {
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

    /// True for every failure of the remote video service, quota included.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_) | Self::QuotaExceeded(_) | Self::Auth(_))
    }

    /// True when the remote service refused the call for quota reasons.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }

    /// True for per-record failures that a snapshot run tallies and skips.
    pub fn is_per_record(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::MalformedRecord { .. })
    }
}
