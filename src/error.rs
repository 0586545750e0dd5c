//! Error types for artifact migration
//!
//! One error enum covers every stage of a run. Stage-level errors (existence
//! queries, listings, missing credentials) abort the run; per-unit errors are
//! recorded in the report and only abort the run under fail-fast.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for migration operations
#[derive(Error, Debug)]
pub enum MigrateError {
    /// I/O error while reading a local source
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source entry does not fit the layout of its artifact kind
    #[error("Cannot classify '{path}': {reason}")]
    Classification { path: String, reason: String },

    /// Network-level failure talking to a remote endpoint
    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote endpoint answered with a non-success HTTP status
    #[error("Unexpected response from '{url}': {status} {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Remote endpoint answered successfully but reported an application error
    #[error("{action} failed: [{code}] {message}")]
    Remote {
        action: String,
        code: String,
        message: String,
    },

    /// Response body could not be decoded
    #[error("Invalid response from '{url}': {message}")]
    Decode { url: String, message: String },

    /// No credentials available for a host that requires them
    #[error("Unauthorized: authentication required for '{0}'. Maybe you haven't logged in before.")]
    Unauthorized(String),

    /// Destination URL does not match the layout of the artifact kind
    #[error("Invalid destination '{url}': {reason}")]
    InvalidDestination { url: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A unit failed while fail-fast was enabled
    #[error("Failed to migrate '{path}': {source}")]
    Aborted {
        path: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// A transfer panicked instead of returning an outcome
    #[error("Transfer panicked: {0}")]
    Panicked(String),

    /// Operation cancelled by user
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a transport error for a request URL
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Create a classification error
    pub fn classification(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Classification {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid destination error
    pub fn invalid_destination(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Check if this error is worth retrying (network-level failures only)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::WithContext { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            Self::WithContext { source, .. } | Self::Aborted { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Result type alias for migration operations
pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Decode {
            url: String::new(),
            message: err.to_string(),
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| MigrateError::io(path, e))
    }
}
