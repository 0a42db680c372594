//! Key-value substrates backing the local cache

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

/// A single mutation inside an atomic storage commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp<'a> {
    Set { key: &'a str, value: &'a str },
    Remove { key: &'a str },
}

/// Synchronous string key-value storage.
///
/// `commit` is all-or-nothing: when it returns an error none of the
/// operations are visible and previously stored values are intact.
pub trait KeyValueStorage: Send + Sync {
    /// Read a raw value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Apply a batch of writes atomically
    fn commit(&self, ops: &[StorageOp<'_>]) -> Result<()>;

    /// Store a single value
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.commit(&[StorageOp::Set { key, value }])
    }

    /// Remove a single value (missing keys are fine)
    fn remove(&self, key: &str) -> Result<()> {
        self.commit(&[StorageOp::Remove { key }])
    }
}

/// In-process storage with an optional byte quota over keys and values.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryEntries>,
    quota_bytes: Option<usize>,
}

#[derive(Debug, Default)]
struct MemoryEntries {
    values: HashMap<String, String>,
    /// Sum of key and value lengths over `values`
    used_bytes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects commits pushing the total size past `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryEntries::default()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryEntries>> {
        self.inner
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))
    }
}

fn entry_bytes(key: &str, value: Option<&str>) -> usize {
    value.map_or(0, |value| key.len() + value.len())
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.values.get(key).cloned())
    }

    fn commit(&self, ops: &[StorageOp<'_>]) -> Result<()> {
        let mut entries = self.lock()?;

        // Last write per key wins; untouched keys are never copied
        let mut staged: HashMap<&str, Option<&str>> = HashMap::with_capacity(ops.len());
        for op in ops {
            match *op {
                StorageOp::Set { key, value } => staged.insert(key, Some(value)),
                StorageOp::Remove { key } => staged.insert(key, None),
            };
        }

        let (released, added) = staged.iter().fold((0, 0), |(released, added), (key, value)| {
            let current = entries.values.get(*key).map(String::as_str);
            (
                released + entry_bytes(key, current),
                added + entry_bytes(key, *value),
            )
        });
        let required = entries.used_bytes - released + added;

        if let Some(limit) = self.quota_bytes {
            if required > limit {
                let key = ops
                    .iter()
                    .find_map(|op| match op {
                        StorageOp::Set { key, .. } => Some((*key).to_string()),
                        StorageOp::Remove { .. } => None,
                    })
                    .unwrap_or_default();
                return Err(Error::QuotaExceeded {
                    key,
                    required,
                    limit,
                });
            }
        }

        for (key, value) in staged {
            match value {
                Some(value) => entries.values.insert(key.to_string(), value.to_string()),
                None => entries.values.remove(key),
            };
        }
        entries.used_bytes = required;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        storage.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        storage.remove("a").unwrap();
    }

    #[test]
    fn quota_failure_keeps_previous_value() {
        let storage = MemoryStorage::with_quota(16);
        storage.set("k", "small").unwrap();

        let error = storage.set("k", &"x".repeat(64)).unwrap_err();
        assert!(matches!(error, Error::QuotaExceeded { .. }));
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let storage = MemoryStorage::with_quota(20);
        storage.set("a", "1").unwrap();

        let big = "y".repeat(30);
        let result = storage.commit(&[
            StorageOp::Remove { key: "a" },
            StorageOp::Set { key: "b", value: &big },
        ]);
        assert!(result.is_err());
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get("b").unwrap(), None);
    }

    #[test]
    fn quota_counts_replaced_and_removed_entries() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("a", "1234").unwrap();
        storage.set("a", "12345678").unwrap();
        assert!(storage.set("b", "1").is_err());

        storage
            .commit(&[
                StorageOp::Remove { key: "a" },
                StorageOp::Set { key: "b", value: "123456789" },
            ])
            .unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert!(storage.set("c", "").is_err());
        storage.remove("b").unwrap();
        storage.set("c", "123456789").unwrap();
    }
}
