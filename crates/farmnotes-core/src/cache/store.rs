//! Typed payload cache with pending-sync tracking

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStorage, StorageOp};
use crate::error::{Error, Result};

/// Reserved key (inside the namespace) holding the pending-sync index
const PENDING_INDEX_KEY: &str = "__pending_sync_keys";

/// A cached value plus its sync bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPayload<T> {
    pub data: T,
    /// Last write time
    pub timestamp: DateTime<Utc>,
    /// Local mutation not yet reflected remotely
    pub pending_sync: bool,
}

/// Namespaced, typed cache over a [`KeyValueStorage`].
///
/// Every `write`, `mark_synced` and `clear` updates the payload and the
/// pending-sync index in one atomic storage commit, so the index never
/// disagrees with the payload flags on disk.
pub struct LocalCacheStore {
    storage: Arc<dyn KeyValueStorage>,
    namespace: String,
    pending: Mutex<BTreeSet<String>>,
}

impl LocalCacheStore {
    /// Open a cache in `namespace`, loading the persisted pending index
    pub fn new(storage: Arc<dyn KeyValueStorage>, namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let index_key = format!("{namespace}:{PENDING_INDEX_KEY}");
        let pending = match storage.get(&index_key)? {
            Some(raw) => serde_json::from_str::<BTreeSet<String>>(&raw).map_err(|error| {
                tracing::warn!("Pending-sync index at {} is unreadable: {}", index_key, error);
                Error::from(error)
            })?,
            None => BTreeSet::new(),
        };

        if !pending.is_empty() {
            tracing::debug!("Loaded {} pending cache keys", pending.len());
        }

        Ok(Self {
            storage,
            namespace,
            pending: Mutex::new(pending),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read a payload, `None` when nothing is stored under `key`
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<StoredPayload<T>>> {
        let Some(raw) = self.storage.get(&self.storage_key(key))? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|error| {
            tracing::warn!("Cached payload '{}' failed to deserialize: {}", key, error);
            Error::from(error)
        })
    }

    /// Store `data` under `key` with the given pending flag
    pub fn write<T: Serialize>(&self, key: &str, data: &T, pending_sync: bool) -> Result<()> {
        let payload = StoredPayload {
            data,
            timestamp: Utc::now(),
            pending_sync,
        };
        let raw = serde_json::to_string(&payload).map_err(|error| {
            tracing::warn!("Failed to serialize cache payload '{}': {}", key, error);
            Error::from(error)
        })?;

        let mut pending = self.lock_pending()?;
        let mut next = pending.clone();
        if pending_sync {
            next.insert(key.to_string());
        } else {
            next.remove(key);
        }

        self.commit_with_index(&pending, &next, StorageOp::Set {
            key: &self.storage_key(key),
            value: &raw,
        })
        .inspect_err(|error| tracing::warn!("Cache write for '{}' failed: {}", key, error))?;

        *pending = next;
        tracing::debug!("Cached '{}' (pending_sync={})", key, pending_sync);
        Ok(())
    }

    /// Clear the pending flag on `key`, leaving its data untouched
    pub fn mark_synced(&self, key: &str) -> Result<()> {
        let storage_key = self.storage_key(key);
        let mut pending = self.lock_pending()?;
        let mut next = pending.clone();
        next.remove(key);

        let raw = match self.storage.get(&storage_key)? {
            Some(raw) => {
                let mut payload: StoredPayload<serde_json::Value> = serde_json::from_str(&raw)?;
                payload.pending_sync = false;
                Some(serde_json::to_string(&payload)?)
            }
            None => None,
        };

        let result = match raw.as_deref() {
            Some(value) => self.commit_with_index(&pending, &next, StorageOp::Set {
                key: &storage_key,
                value,
            }),
            None => self.commit_index(&pending, &next),
        };
        result.inspect_err(|error| tracing::warn!("Failed to mark '{}' synced: {}", key, error))?;

        *pending = next;
        Ok(())
    }

    /// Remove `key` and drop it from the pending index
    pub fn clear(&self, key: &str) -> Result<()> {
        let mut pending = self.lock_pending()?;
        let mut next = pending.clone();
        next.remove(key);

        self.commit_with_index(&pending, &next, StorageOp::Remove {
            key: &self.storage_key(key),
        })
        .inspect_err(|error| tracing::warn!("Failed to clear cache key '{}': {}", key, error))?;

        *pending = next;
        Ok(())
    }

    /// Whether `key` holds a local mutation not yet synced
    pub fn is_pending(&self, key: &str) -> bool {
        self.lock_pending()
            .map(|pending| pending.contains(key))
            .unwrap_or(false)
    }

    /// Keys with pending local writes, in sorted order
    pub fn pending_keys(&self) -> Vec<String> {
        self.lock_pending()
            .map(|pending| pending.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_pending(&self) -> bool {
        self.lock_pending()
            .map(|pending| !pending.is_empty())
            .unwrap_or(false)
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, BTreeSet<String>>> {
        self.pending
            .lock()
            .map_err(|error| Error::Storage(format!("pending index lock poisoned: {error}")))
    }

    fn commit_with_index(
        &self,
        current: &BTreeSet<String>,
        next: &BTreeSet<String>,
        op: StorageOp<'_>,
    ) -> Result<()> {
        if current == next {
            return self.storage.commit(&[op]);
        }
        let index_key = self.storage_key(PENDING_INDEX_KEY);
        let index = serde_json::to_string(next)?;
        self.storage.commit(&[
            op,
            StorageOp::Set {
                key: &index_key,
                value: &index,
            },
        ])
    }

    fn commit_index(&self, current: &BTreeSet<String>, next: &BTreeSet<String>) -> Result<()> {
        if current == next {
            return Ok(());
        }
        let index_key = self.storage_key(PENDING_INDEX_KEY);
        let index = serde_json::to_string(next)?;
        self.storage.set(&index_key, &index)
    }
}
