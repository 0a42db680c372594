//! farmnotes-core - Core library for Farm Notes
//!
//! Offline-first notes for farm teams: the note model and its wire mapping,
//! a local cache with pending-sync tracking, connectivity monitoring, the
//! sync coordinator and the notes repository that ties them together.

pub mod auth;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod remote;
pub mod repository;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteChanges, NoteDraft, NoteFilter, NoteId};
pub use repository::NotesRepository;
