//! Note repository
//!
//! Mediates between application code and the `notes` collection. Every
//! method:
//!
//! - runs under its own `OperationDeadline` (10 seconds by default)
//! - issues one store call, or a find followed by a decode loop
//! - translates the store's "no document" signal into `RepoError::NotFound`
//!   on lookups; every other store error is passed through unchanged
//!
//! Ids are always generated here. Updates only ever touch `title` and
//! `description`.

mod deadline;
mod error;

pub use deadline::OperationDeadline;
pub use error::{DecodeError, RepoError, RepoResult};

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::database::Database;
use crate::models::{Note, NoteDraft};
use crate::object_id::ObjectId;
use crate::pagination::pagination_options;
use crate::store::{
    Collection, Cursor, DeleteResult, Document, Filter, UpdateResult, UpdateSpec, ID_FIELD,
};

/// Name of the collection notes are stored in
pub const NOTES_COLLECTION: &str = "notes";

/// Deadline applied when none is configured
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// A stored document that `get_all` passed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    /// Id field of the document, if it had one
    pub id: Option<String>,
    /// Why it could not be decoded
    pub reason: String,
}

/// Result of `get_all`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotePage {
    /// Notes in store order
    pub notes: Vec<Note>,
    /// Documents that matched but failed to decode
    pub skipped: Vec<SkippedDocument>,
}

impl NotePage {
    /// Check whether every matched document was decoded
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Data access for notes
#[derive(Clone)]
pub struct NoteRepository {
    notes: Arc<dyn Collection>,
    timeout: Duration,
}

impl NoteRepository {
    /// Create a repository over a notes collection
    pub fn new(notes: Arc<dyn Collection>) -> Self {
        Self {
            notes,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Create a repository over the `notes` collection of `db`
    pub fn from_database(db: &Database, config: &Config) -> Self {
        Self::new(db.collection(NOTES_COLLECTION)).with_timeout(config.operation_timeout())
    }

    /// Set the per-operation deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-operation deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying collection
    pub fn collection(&self) -> &Arc<dyn Collection> {
        &self.notes
    }

    fn deadline(&self, operation: &'static str) -> OperationDeadline {
        OperationDeadline::start(operation, self.timeout)
    }

    /// List notes, optionally one page at a time
    ///
    /// `page` is 1-based; paging applies only when both `page` and `limit`
    /// are given. Documents that fail to decode are skipped and reported in
    /// `NotePage::skipped`. If the cursor fails or the deadline passes while
    /// reading, the error is `RepoError::ListInterrupted` carrying the notes
    /// and skipped documents read so far.
    pub async fn get_all(&self, page: Option<u64>, limit: Option<u64>) -> RepoResult<NotePage> {
        let deadline = self.deadline("get_all");
        let options = pagination_options(limit, page);

        let mut cursor = deadline.run(self.notes.find(Filter::all(), options)).await?;

        let mut result = NotePage::default();
        let drained = deadline.run(drain_notes(&mut cursor, &mut result)).await;
        cursor.close();

        if !result.skipped.is_empty() {
            warn!(
                skipped = result.skipped.len(),
                "Skipped undecodable note documents"
            );
        }

        match drained {
            Ok(()) => {
                debug!(
                    count = result.notes.len(),
                    ?page,
                    ?limit,
                    "Listed notes"
                );
                Ok(result)
            }
            Err(source) => Err(RepoError::ListInterrupted {
                notes: result.notes,
                skipped: result.skipped,
                source: Box::new(source),
            }),
        }
    }

    /// Get one note by id
    pub async fn get_by_id(&self, id: &ObjectId) -> RepoResult<Note> {
        let deadline = self.deadline("get_by_id");

        let found = deadline.run(self.notes.find_one(id_filter(id))).await?;

        match found {
            Some(document) => Ok(decode_note(document)?),
            None => {
                debug!(%id, "Note not found");
                Err(RepoError::NotFound { id: *id })
            }
        }
    }

    /// Store a new note and return its generated id
    ///
    /// Accepts anything convertible to a draft; an id on the input is ignored.
    pub async fn create(&self, note: impl Into<NoteDraft>) -> RepoResult<ObjectId> {
        let deadline = self.deadline("create");
        let note = note.into().into_note(ObjectId::new());
        let document = encode_note(&note)?;

        deadline.run(self.notes.insert_one(document)).await?;

        debug!(id = %note.id, "Created note");
        Ok(note.id)
    }

    /// Replace the title and description of the note with `id`
    ///
    /// A missing note is not an error: the result has `matched_count == 0`.
    pub async fn update(
        &self,
        id: &ObjectId,
        note: impl Into<NoteDraft>,
    ) -> RepoResult<UpdateResult> {
        let deadline = self.deadline("update");
        let draft = note.into();

        let mut fields = Document::new();
        fields.insert("title".to_string(), Value::String(draft.title));
        fields.insert("description".to_string(), Value::String(draft.description));

        let result = deadline
            .run(self.notes.update_one(id_filter(id), UpdateSpec::set(fields)))
            .await?;

        debug!(
            %id,
            matched = result.matched_count,
            modified = result.modified_count,
            "Updated note"
        );
        Ok(result)
    }

    /// Delete the note with `id`
    ///
    /// A missing note is not an error: the result has `deleted_count == 0`.
    pub async fn delete(&self, id: &ObjectId) -> RepoResult<DeleteResult> {
        let deadline = self.deadline("delete");

        let result = deadline.run(self.notes.delete_one(id_filter(id))).await?;

        debug!(%id, deleted = result.deleted_count, "Deleted note");
        Ok(result)
    }
}

async fn drain_notes(cursor: &mut Cursor, page: &mut NotePage) -> RepoResult<()> {
    while let Some(item) = cursor.next().await {
        match decode_note(item?) {
            Ok(note) => page.notes.push(note),
            Err(e) => {
                warn!(id = ?e.id, error = %e.source, "Skipping undecodable note document");
                page.skipped.push(SkippedDocument {
                    id: e.id,
                    reason: e.source.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn id_filter(id: &ObjectId) -> Filter {
    Filter::eq(ID_FIELD, id.to_hex())
}

fn encode_note(note: &Note) -> RepoResult<Document> {
    match serde_json::to_value(note).map_err(RepoError::Encode)? {
        Value::Object(document) => Ok(document),
        other => Err(RepoError::Encode(serde::ser::Error::custom(format!(
            "expected an object, got {}",
            other
        )))),
    }
}

fn decode_note(document: Document) -> Result<Note, DecodeError> {
    let id = document.get(ID_FIELD).map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    serde_json::from_value(Value::Object(document)).map_err(|source| DecodeError { id, source })
}
