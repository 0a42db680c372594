//! Domain repositories composed from the cache, connectivity and sync layers.

mod notes;
mod operation;

pub use notes::{NotesRepository, NOTES_COLLECTION};
pub use operation::NoteOperation;
