//! Queued note mutations and how they rebase onto a fresh remote snapshot

use serde::{Deserialize, Serialize};

use crate::models::{Note, NoteChanges, NoteId};
use crate::sync::OperationLog;

/// A note mutation made offline, waiting to be pushed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NoteOperation {
    /// Insert a note that only exists locally under a provisional id
    Create { note: Note },
    /// Send only these fields for `id`
    Update { id: NoteId, changes: NoteChanges },
    Delete { id: NoteId },
}

impl NoteOperation {
    /// Id of the note this operation touches
    pub const fn note_id(&self) -> &NoteId {
        match self {
            Self::Create { note } => &note.id,
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }

    pub fn targets(&self, id: &NoteId) -> bool {
        self.note_id() == id
    }

    /// Point this operation at `to` if it referenced `from`
    pub fn rename(&mut self, from: &NoteId, to: &NoteId) {
        match self {
            Self::Create { note } if &note.id == from => note.id = to.clone(),
            Self::Update { id, .. } | Self::Delete { id } if *id == *from => *id = to.clone(),
            _ => {}
        }
    }

    /// Apply this operation to a local list, as if it had already reached
    /// the remote store
    pub fn apply_to(&self, notes: &mut Vec<Note>) {
        match self {
            Self::Create { note } => {
                if !notes.iter().any(|existing| existing.id == note.id) {
                    notes.insert(0, note.clone());
                }
            }
            Self::Update { id, changes } => {
                if let Some(existing) = notes.iter_mut().find(|existing| &existing.id == id) {
                    existing.apply_changes(changes);
                }
            }
            Self::Delete { id } => notes.retain(|existing| &existing.id != id),
        }
    }
}

/// Replay every queued operation over `notes` in order
pub fn rebase(notes: &mut Vec<Note>, operations: &OperationLog<NoteOperation>) {
    for operation in operations.iter() {
        operation.apply_to(notes);
    }
}
