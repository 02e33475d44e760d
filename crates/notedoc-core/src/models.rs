//! Data models for notedoc
//!
//! Defines the note entity and the input shape used to create or update it.
//! Field names double as the stored document keys.

use serde::{Deserialize, Serialize};

use crate::object_id::ObjectId;

/// A text note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Unique identifier, assigned by the repository on creation
    pub id: ObjectId,
    /// Note title
    pub title: String,
    /// Note body
    pub description: String,
}

impl Note {
    /// Create a note with a freshly generated id
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            title: title.into(),
            description: description.into(),
        }
    }

    /// The mutable fields of this note
    pub fn draft(&self) -> NoteDraft {
        NoteDraft::from(self)
    }
}

/// Caller-supplied note content for create and update
///
/// Carries no id: identifiers are never chosen by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Attach an id, producing the full note
    pub fn into_note(self, id: ObjectId) -> Note {
        Note {
            id,
            title: self.title,
            description: self.description,
        }
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            description: note.description.clone(),
        }
    }
}

impl From<&NoteDraft> for NoteDraft {
    fn from(draft: &NoteDraft) -> Self {
        draft.clone()
    }
}

impl From<Note> for NoteDraft {
    fn from(note: Note) -> Self {
        Self {
            title: note.title,
            description: note.description,
        }
    }
}
