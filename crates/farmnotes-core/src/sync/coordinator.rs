//! Per-collection sync state and the in-flight replay guard

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::LocalCacheStore;
use crate::error::{Error, Result};

/// Sync state of one collection key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No pending local writes
    Clean,
    /// At least one local write not yet reflected remotely
    Dirty,
    /// Replay in progress
    Syncing,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => f.write_str("clean"),
            Self::Dirty => f.write_str("dirty"),
            Self::Syncing => f.write_str("syncing"),
        }
    }
}

/// Result of a sync request that did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Replay ran to completion
    Synced,
    /// Nothing was pending; no remote calls were made
    AlreadyClean,
    /// Another replay of the same collection is running
    InFlight,
}

/// Decides when a collection replays and keeps replays from overlapping.
///
/// `Clean` and `Dirty` come from the cache's pending-sync index; `Syncing`
/// is held by an in-flight guard for the duration of a replay. Dropping the
/// replay future releases the guard, and since only the replay itself clears
/// the pending flag the collection falls back to `Dirty`.
pub struct SyncCoordinator {
    cache: Arc<LocalCacheStore>,
    in_flight: Mutex<HashSet<String>>,
}

impl SyncCoordinator {
    pub fn new(cache: Arc<LocalCacheStore>) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn state(&self, collection: &str) -> SyncState {
        let syncing = self
            .lock_in_flight()
            .map(|in_flight| in_flight.contains(collection))
            .unwrap_or(false);
        if syncing {
            SyncState::Syncing
        } else if self.cache.is_pending(collection) {
            SyncState::Dirty
        } else {
            SyncState::Clean
        }
    }

    /// Run `replay` for `collection` if it is dirty and not already syncing.
    ///
    /// `replay` is responsible for pushing queued work and clearing the
    /// pending flag once the remote reflects it. A failure is returned as is
    /// and the collection stays `Dirty`.
    pub async fn sync<F, Fut>(&self, collection: &str, replay: F) -> Result<SyncOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let Some(_guard) = self.try_begin(collection)? else {
            tracing::debug!("Sync of '{}' already in flight", collection);
            return Ok(SyncOutcome::InFlight);
        };

        if !self.cache.is_pending(collection) {
            tracing::debug!("Sync of '{}' skipped: nothing pending", collection);
            return Ok(SyncOutcome::AlreadyClean);
        }

        tracing::info!("Syncing '{}'", collection);
        match replay().await {
            Ok(()) => {
                if self.cache.is_pending(collection) {
                    tracing::info!("Synced '{}'; newer local changes still pending", collection);
                } else {
                    tracing::info!("Synced '{}'", collection);
                }
                Ok(SyncOutcome::Synced)
            }
            Err(error) => {
                tracing::warn!("Sync of '{}' failed, keeping local changes: {}", collection, error);
                Err(error)
            }
        }
    }

    fn try_begin(&self, collection: &str) -> Result<Option<InFlightGuard<'_>>> {
        let mut in_flight = self.lock_in_flight()?;
        if !in_flight.insert(collection.to_string()) {
            return Ok(None);
        }
        Ok(Some(InFlightGuard {
            coordinator: self,
            collection: collection.to_string(),
        }))
    }

    fn lock_in_flight(&self) -> Result<MutexGuard<'_, HashSet<String>>> {
        self.in_flight
            .lock()
            .map_err(|error| Error::Storage(format!("sync guard lock poisoned: {error}")))
    }
}

struct InFlightGuard<'a> {
    coordinator: &'a SyncCoordinator,
    collection: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.coordinator.in_flight.lock() {
            in_flight.remove(&self.collection);
        }
    }
}
