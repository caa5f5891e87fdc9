//! Error types for feedscribe.
//!
//! Library crates use [`FeedscribeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all feedscribe operations.
///
/// Only [`FeedscribeError::Io`] raised while reading the feed or creating the
/// output directory, [`FeedscribeError::Parse`] and [`FeedscribeError::Config`]
/// stop a run. Everything else is contained to the item that produced it.
#[derive(Debug, thiserror::Error)]
pub enum FeedscribeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The feed document is not well-formed or does not match the expected schema.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A date field does not match the feed's timestamp layout.
    #[error("invalid date '{value}': {message}")]
    DateFormat { value: String, message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FeedscribeError>;

impl FeedscribeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a date format error for the offending raw value.
    pub fn date_format(value: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DateFormat {
            value: value.into(),
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
