//! Errors that abort a validation session before any check runs.
//!
//! Everything discovered while walking a file is recorded as a
//! [`Finding`](crate::Finding) instead.

use std::path::PathBuf;

use thiserror::Error;

/// Setup failures of a [`Validator`](crate::Validator).
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The data file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The data file exists but could not be opened as a tree.
    #[error("cannot open {}: {reason}", path.display())]
    OpenFailure { path: PathBuf, reason: String },

    /// The corpus does not define exactly one pattern with this name.
    #[error("could not read pattern *{name}* from the definition corpus ({found} definitions)")]
    SchemaPatternMissing { name: String, found: usize },

    /// A corpus pattern is not a valid regular expression.
    #[error("invalid pattern *{name}*: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Convenience alias for results with [`ValidatorError`].
pub type Result<T> = std::result::Result<T, ValidatorError>;
