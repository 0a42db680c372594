//! Ordered log of mutations made while offline

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A queued mutation and when it happened locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation<Op> {
    pub operation: Op,
    pub queued_at: DateTime<Utc>,
}

/// FIFO queue of offline mutations, replayed front to back.
///
/// The log itself is plain data; callers persist it together with the
/// collection it belongs to so both change in the same cache write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog<Op> {
    entries: VecDeque<QueuedOperation<Op>>,
}

impl<Op> Default for OperationLog<Op> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<Op> OperationLog<Op> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: Op) {
        self.entries.push_back(QueuedOperation {
            operation,
            queued_at: Utc::now(),
        });
    }

    /// Oldest operation still waiting for replay
    pub fn front(&self) -> Option<&QueuedOperation<Op>> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<QueuedOperation<Op>> {
        self.entries.pop_front()
    }

    /// Keep only operations matching `keep`; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&Op) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| keep(&entry.operation));
        before - self.entries.len()
    }

    /// Rewrite every queued operation in place
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Op)) {
        for entry in &mut self.entries {
            f(&mut entry.operation);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.entries.iter().map(|entry| &entry.operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replays_in_insertion_order() {
        let mut log = OperationLog::new();
        log.push("create");
        log.push("update");
        log.push("delete");

        assert_eq!(log.front().map(|entry| entry.operation), Some("create"));
        let drained: Vec<_> = std::iter::from_fn(|| log.pop_front())
            .map(|entry| entry.operation)
            .collect();
        assert_eq!(drained, vec!["create", "update", "delete"]);
        assert!(log.is_empty());
    }

    #[test]
    fn retain_reports_dropped_count() {
        let mut log = OperationLog::new();
        for value in 1..=5 {
            log.push(value);
        }
        assert_eq!(log.retain(|value| value % 2 == 1), 2);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut log = OperationLog::new();
        log.push(7_u8);
        log.for_each_mut(|value| *value += 1);

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(1));
        assert_eq!(json[0]["operation"], 8);
        assert!(json[0]["queuedAt"].is_string());

        let restored: OperationLog<u8> = serde_json::from_value(json).unwrap();
        assert_eq!(restored, log);
    }
}
