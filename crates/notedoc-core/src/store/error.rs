//! Store error handling
//!
//! Provides typed errors for document store operations with descriptive
//! messages.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Automerge rejected an operation
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Failed to read or write the store file
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Store file exists but could not be loaded
    #[error("Store file '{path}' is corrupted: {details}")]
    Corrupt { path: PathBuf, details: String },

    /// A value the engine cannot represent
    #[error("Unsupported value: {0}")]
    Unsupported(String),

    /// The store layout is missing an expected object
    #[error("Missing store object: {0}")]
    MissingObject(String),

    /// A background store write panicked or was cancelled
    #[error("Store write task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Create an I/O error with path context
    pub fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
