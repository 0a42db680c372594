//! Error types for farmnotes-core

use thiserror::Error;

/// Result type alias using farmnotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in farmnotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// An operation needed a signed-in actor and none was available
    #[error("You must be signed in to perform this action")]
    AuthRequired,

    /// The signed-in actor has no institution assigned in their profile
    #[error("Your profile is not assigned to an institution")]
    NoInstitution,

    /// The remote store rejected or failed a write
    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    /// The remote store could not be read
    #[error("Remote read failed: {0}")]
    RemoteReadFailed(String),

    /// A remote round trip was requested while offline
    #[error("No network connection; local changes stay queued")]
    Offline,

    /// Record not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Local storage substrate failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local storage quota would be exceeded by a write
    #[error("Storage quota exceeded writing '{key}' ({required} bytes, limit {limit})")]
    QuotaExceeded {
        key: String,
        required: usize,
        limit: usize,
    },

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
