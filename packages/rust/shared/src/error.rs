//! Error types for LinkForge.
//!
//! Library crates use [`LinkForgeError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LinkForge operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Document scanning or link extraction error.
    #[error("scan error: {message}")]
    Scan { message: String },

    /// Network/HTTP error while talking to the remote store.
    #[error("network error: {0}")]
    Network(String),

    /// Persistence backend error (remote table store or flat file).
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad record shape, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LinkForgeError>;

impl LinkForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a scan error from any displayable message.
    pub fn scan(msg: impl Into<String>) -> Self {
        Self::Scan {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LinkForgeError::config("missing tracking base path");
        assert_eq!(err.to_string(), "config error: missing tracking base path");

        let err = LinkForgeError::Storage("HTTP 502 from remote table".into());
        assert!(err.to_string().contains("502"));
    }
}
