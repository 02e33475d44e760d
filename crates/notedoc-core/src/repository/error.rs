//! Repository error handling
//!
//! Store-level failures are translated into a small vocabulary callers can
//! match on without knowing how the store signals them.

use std::time::Duration;

use thiserror::Error;

use super::SkippedDocument;
use crate::models::Note;
use crate::object_id::ObjectId;
use crate::store::StoreError;

/// A stored document that could not be read as a note
#[derive(Error, Debug)]
#[error("document {} is not a valid note: {source}", .id.as_deref().unwrap_or("<no id>"))]
pub struct DecodeError {
    /// Id field of the offending document, if it had one
    pub id: Option<String>,
    #[source]
    pub source: serde_json::Error,
}

/// Errors returned by `NoteRepository`
#[derive(Error, Debug)]
pub enum RepoError {
    /// No note has the requested id
    #[error("note with id {id} not found")]
    NotFound { id: ObjectId },

    /// The operation did not finish before its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Any other store failure, passed through unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A matched document could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A note could not be turned into a document
    #[error("failed to encode note: {0}")]
    Encode(#[source] serde_json::Error),

    /// Listing stopped part way; `notes` and `skipped` hold what was read
    /// before the failure
    #[error("listing interrupted after {} note(s): {source}", .notes.len())]
    ListInterrupted {
        notes: Vec<Note>,
        skipped: Vec<SkippedDocument>,
        #[source]
        source: Box<RepoError>,
    },
}

impl RepoError {
    /// Check whether this error means the note does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }

    /// Check whether this error (or the failure behind an interrupted
    /// listing) is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        match self {
            RepoError::Timeout { .. } => true,
            RepoError::ListInterrupted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Notes read before an interrupted listing failed
    pub fn partial_notes(&self) -> &[Note] {
        match self {
            RepoError::ListInterrupted { notes, .. } => notes,
            _ => &[],
        }
    }

    /// Undecodable documents passed over before an interrupted listing failed
    pub fn partial_skipped(&self) -> &[SkippedDocument] {
        match self {
            RepoError::ListInterrupted { skipped, .. } => skipped,
            _ => &[],
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
