//! Typed error handling for beangraph.
//!
//! Definition, unsatisfied and ambiguous problems are collected during a pass and
//! reported together. Internal invariant violations abort the pass.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for beangraph operations.
#[derive(Error, Debug)]
pub enum BeanGraphError {
    /// Malformed declaration; the declaration is excluded from the deployment
    #[error("Definition error on {declaration}: {message}")]
    Definition {
        declaration: String,
        message: String,
    },

    /// A required injection point matched no component
    #[error("Unsatisfied dependency for type {required_type} and qualifiers {qualifiers}\n\t- injection point: {point}\n\t- declared on {owner}")]
    Unsatisfied {
        required_type: String,
        qualifiers: String,
        point: String,
        owner: String,
    },

    /// A required injection point matched several components that could not be disambiguated
    #[error("Ambiguous dependencies for type {required_type} and qualifiers {qualifiers}\n\t- injection point: {point}\n\t- declared on {owner}\n\t- available components:\n\t\t- {}", .candidates.join("\n\t\t- "))]
    Ambiguous {
        required_type: String,
        qualifiers: String,
        point: String,
        owner: String,
        candidates: Vec<String>,
    },

    /// Several components share a name and none of them wins disambiguation
    #[error("Unresolvable ambiguous component name detected: {name}\n\t- components:\n\t\t- {}", .candidates.join("\n\t\t- "))]
    AmbiguousName { name: String, candidates: Vec<String> },

    /// Inconsistent declaration snapshot; aborts the pass
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// I/O error when reading snapshots or configuration
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Snapshot could not be decoded
    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    /// Every problem collected during one resolution pass
    #[error("{} problem(s) detected during resolution:\n{}", .problems.len(), format_problems(.problems))]
    Validation { problems: Vec<BeanGraphError> },
}

fn format_problems(problems: &[BeanGraphError]) -> String {
    problems
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n")
}

impl BeanGraphError {
    /// Create a definition error for the named declaration.
    pub fn definition(declaration: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            declaration: declaration.into(),
            message: message.into(),
        }
    }

    /// Create an internal invariant violation.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a snapshot decoding error.
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Fatal errors stop the pass; everything else is aggregated into the report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Internal { .. } | Self::Io { .. } | Self::Config { .. } | Self::Snapshot { .. }
        )
    }

    /// Check if this error came out of injection point resolution.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::Unsatisfied { .. } | Self::Ambiguous { .. } | Self::AmbiguousName { .. }
        )
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for beangraph results.
pub type BeanGraphResult<T> = Result<T, BeanGraphError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> BeanGraphResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> BeanGraphResult<T> {
        self.map_err(|e| BeanGraphError::io(path, e))
    }
}
