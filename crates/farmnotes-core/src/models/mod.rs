//! Data models for Farm Notes

mod filter;
mod note;
mod wire;

pub use filter::{CompletionFilter, NoteFilter};
pub use note::{sort_newest_first, Note, NoteChanges, NoteDraft, NoteId, PROVISIONAL_ID_PREFIX};
pub use wire::{NewNoteRow, NoteChangesRow, NoteRow};
