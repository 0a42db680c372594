//! Remote record store seam.
//!
//! The repository talks to the backend only through [`RemoteNoteStore`].
//! [`SupabaseRestClient`] implements it for a PostgREST endpoint; tests plug
//! in their own fakes.

mod supabase;

use thiserror::Error;

use crate::models::{NewNoteRow, NoteChangesRow, NoteId, NoteRow};

pub use supabase::SupabaseRestClient;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store is not configured: {0}")]
    NotConfigured(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {message}")]
    Api { status: u16, message: String },
    #[error("Remote record not found: {0}")]
    NotFound(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

impl RemoteError {
    /// Whether the failure says nothing about the request itself, only that
    /// the backend could not be reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(error) if error.is_connect() || error.is_timeout())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// CRUD over the remote `notes` collection.
///
/// Scoping to the caller's institution is enforced server side; rows outside
/// it are simply absent. Update and delete of a missing id report
/// [`RemoteError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait RemoteNoteStore {
    /// All visible notes, newest `note_date` first
    async fn fetch_notes(&self) -> RemoteResult<Vec<NoteRow>>;

    async fn insert_note(&self, row: &NewNoteRow) -> RemoteResult<NoteRow>;

    /// Apply only the fields present in `changes`
    async fn update_note(&self, id: &NoteId, changes: &NoteChangesRow) -> RemoteResult<NoteRow>;

    async fn delete_note(&self, id: &NoteId) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_failures_are_not_transport() {
        let api = RemoteError::Api {
            status: 403,
            message: "permission denied".to_string(),
        };
        assert!(!api.is_transport());
        assert_eq!(api.to_string(), "Remote API error: permission denied");
        assert!(!RemoteError::NotFound("n-1".to_string()).is_transport());
    }
}
