//! Error types for Lifelog operations.
//!
//! This module provides a common `Error` type and `Result<T>` alias used across
//! all Lifelog crates. Uses `thiserror` for derive macros.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur in Lifelog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific file.
    #[error("I/O error at {}: {source}", path.display())]
    IoWithPath {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of resource (e.g. "Data file").
        resource: String,
        /// Identifier or path of the missing resource.
        id: String,
    },

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A generic operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),

    /// The embedding collaborator failed.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// Provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's length disagrees with the index dimension.
    #[error("Dimension mismatch: index has dimension {expected}, vector has {actual}")]
    DimensionMismatch {
        /// The index's fixed dimension.
        expected: usize,
        /// The offending vector's length.
        actual: usize,
    },

    /// No in-memory index and no loadable snapshot.
    #[error("Index missing: {0}")]
    MissingIndex(String),

    /// A position lookup past the end of the metadata or text arrays.
    #[error("Position {index} is out of range ({len} entries)")]
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// Number of stored entries.
        len: usize,
    },

    /// Vectors, metadata, and texts disagree with one another.
    #[error("Inconsistent snapshot: {0}")]
    Inconsistent(String),
}

impl Error {
    /// Create an I/O error without path context.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(err)
    }

    /// Create an I/O error carrying the path it occurred on.
    pub fn io_with_path(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source: err,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an embedding error.
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a missing index error.
    pub fn missing_index(msg: impl Into<String>) -> Self {
        Self::MissingIndex(msg.into())
    }

    /// Create an inconsistent snapshot error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }

    /// True if this error means no index could be found.
    pub fn is_missing_index(&self) -> bool {
        matches!(self, Self::MissingIndex(_))
    }

    /// True if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Lifelog's Error type.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================
