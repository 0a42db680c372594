//! Offline replay: per-collection sync state and the queued operation log.

mod coordinator;
mod oplog;

pub use coordinator::{SyncCoordinator, SyncOutcome, SyncState};
pub use oplog::{OperationLog, QueuedOperation};
