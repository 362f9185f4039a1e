//! Error types for polycrawl.
//!
//! Library crates use [`PolycrawlError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all polycrawl operations.
#[derive(Debug, thiserror::Error)]
pub enum PolycrawlError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during fetch or index posting.
    #[error("network error: {0}")]
    Network(String),

    /// Freshness store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A base URL too malformed to resolve references against.
    ///
    /// This points at a bug or misconfiguration upstream, not bad page data.
    #[error("invalid base URL {base:?}: {reason}")]
    InvalidBase { base: String, reason: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PolycrawlError>;

impl PolycrawlError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-base error for the resolver.
    pub fn invalid_base(base: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBase {
            base: base.into(),
            reason: reason.into(),
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
