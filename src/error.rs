//! Error types for vsco-dl
//!
//! This module provides error handling for the library, including:
//! - A single [`Error`] enum covering network, response-shape, filesystem and setup failures
//! - An [`ErrorKind`] classification matching how the pipelines isolate failures
//!   (per page, per item, or for the whole category run)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vsco-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vsco-dl
///
/// Each variant carries enough context to log the failure and retry it later.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "harvest.workers")
        key: Option<String>,
    },

    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Status code returned by the server
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// JSON response is missing fields or has the wrong shape
    #[error("malformed response from {context}: {message}")]
    MalformedResponse {
        /// Where the response came from (endpoint, article permalink, ...)
        context: String,
        /// What was wrong with it
        message: String,
    },

    /// I/O error without a useful path attached
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem operation on a specific path failed
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// Path being created, written or renamed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Run was cancelled before this unit of work started
    #[error("cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Coarse failure classes used by the pipelines to decide how far an error propagates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or HTTP failure; retryable and isolated to its stripe or item
    TransientFetch,
    /// Response lacked expected fields; fatal for that page or item only
    MalformedResponse,
    /// Directory creation or file write failed; fatal for that item
    Filesystem,
    /// Invalid configuration, cancellation or anything else that stops the run
    Setup,
}

impl Error {
    /// Build a [`Error::MalformedResponse`]
    pub fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Filesystem`] for `path`
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Build a [`Error::Config`] naming the offending key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Classify this error into the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) | Error::Http { .. } => ErrorKind::TransientFetch,
            Error::MalformedResponse { .. } | Error::Serialization(_) => {
                ErrorKind::MalformedResponse
            }
            Error::Io(_) | Error::Filesystem { .. } => ErrorKind::Filesystem,
            Error::Config { .. } | Error::InvalidUrl(_) | Error::Cancelled | Error::Other(_) => {
                ErrorKind::Setup
            }
        }
    }

    /// Whether this error came from the cancellation token rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
