//! Local cache layer: typed payloads with pending-sync flags over a
//! pluggable key-value substrate.

mod sqlite;
mod storage;
mod store;

pub use sqlite::SqliteStorage;
pub use storage::{KeyValueStorage, MemoryStorage, StorageOp};
pub use store::{LocalCacheStore, StoredPayload};
