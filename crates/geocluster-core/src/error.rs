//! Error types for the clustering pipeline

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// No usable latitude/longitude column pair in the input header
    #[error("Schema error: no {missing} column found (available columns: {available})")]
    Schema { missing: String, available: String },

    /// Input unreadable or output unwritable
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural CSV failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Every clustering strategy failed
    #[error("Clustering failed: {0}")]
    Clustering(String),
}

impl Error {
    /// Create a schema error listing the columns that were available
    pub fn schema<S: AsRef<str>>(missing: impl Into<String>, available: &[S]) -> Self {
        let mut names: Vec<&str> = available.iter().map(|s| s.as_ref()).take(20).collect();
        if available.len() > names.len() {
            names.push("...");
        }
        Self::Schema {
            missing: missing.into(),
            available: names.join(", "),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a clustering error
    pub fn clustering(message: impl Into<String>) -> Self {
        Self::Clustering(message.into())
    }

    /// Whether this is a schema detection failure
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema { .. })
    }
}

/// Recoverable faults raised by a single clustering strategy.
///
/// These never abort the pipeline on their own; the fallback chain
/// moves on to the next strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// Fewer points than the strategy needs
    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Parameter outside the range the strategy accepts
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Input larger than the strategy's pairwise budget
    #[error("too many points: {actual} exceeds limit of {limit}")]
    TooManyPoints { limit: usize, actual: usize },

    /// Strategy returned a label vector of the wrong length
    #[error("label count mismatch: expected {expected}, got {actual}")]
    LabelCountMismatch { expected: usize, actual: usize },
}

impl ClusterError {
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
