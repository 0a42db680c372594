//! Translation between the remote row shape and the domain model.
//!
//! The remote store persists snake_case columns; the domain model serializes
//! camelCase into the local cache. Every conversion between the two goes
//! through this module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::note::{double_option, Note, NoteChanges, NoteDraft, NoteId};

/// A `notes` row as returned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub note_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub institution_id: Option<String>,
}

/// Insert payload. Timestamps and the id are assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNoteRow {
    pub title: String,
    pub content: String,
    pub note_date: NaiveDate,
    pub is_completed: bool,
    pub completed_date: Option<NaiveDate>,
    pub user_id: String,
    pub institution_id: String,
}

/// Partial update payload; unset fields are omitted from the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteChangesRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub completed_date: Option<Option<NaiveDate>>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: NoteId::from(row.id),
            title: row.title,
            content: row.content.unwrap_or_default(),
            note_date: row.note_date,
            is_completed: row.is_completed,
            completed_date: if row.is_completed {
                row.completed_date.or(Some(row.updated_at.date_naive()))
            } else {
                None
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_id: row.user_id,
            institution_id: row.institution_id,
        }
    }
}

impl From<&Note> for NoteRow {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.to_string(),
            title: note.title.clone(),
            content: Some(note.content.clone()),
            note_date: note.note_date,
            is_completed: note.is_completed,
            completed_date: note.completed_date,
            created_at: note.created_at,
            updated_at: note.updated_at,
            user_id: note.user_id.clone(),
            institution_id: note.institution_id.clone(),
        }
    }
}

impl From<&NoteChanges> for NoteChangesRow {
    fn from(changes: &NoteChanges) -> Self {
        Self {
            title: changes.title.clone(),
            content: changes.content.clone(),
            note_date: changes.note_date,
            is_completed: changes.is_completed,
            completed_date: changes.completed_date,
        }
    }
}

impl NewNoteRow {
    /// Insert payload for a fresh draft, scoped to the given owner
    pub fn from_draft(
        draft: NoteDraft,
        user_id: impl Into<String>,
        institution_id: impl Into<String>,
    ) -> Self {
        let draft = draft.normalized();
        Self {
            title: draft.title,
            content: draft.content,
            note_date: draft.note_date,
            is_completed: draft.is_completed,
            completed_date: draft.completed_date,
            user_id: user_id.into(),
            institution_id: institution_id.into(),
        }
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            note_date: note.note_date,
            is_completed: note.is_completed,
            completed_date: note.completed_date,
        }
    }
}
