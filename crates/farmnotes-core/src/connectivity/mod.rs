//! Connectivity monitoring.
//!
//! The monitor holds the current online/offline status in a `watch` channel.
//! Readings can be pushed by the host or sampled through a
//! [`ConnectivityProbe`]; identical consecutive readings are swallowed so
//! every emitted [`ConnectivityEvent`] is a real transition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::cache::LocalCacheStore;
use crate::error::Result;

/// Cache key used to remember the last observed status between runs
pub const LAST_STATUS_KEY: &str = "connectivity:last_status";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Online,
    Offline,
}

impl ConnectivityStatus {
    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// A change of connectivity state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityEvent {
    WentOnline,
    WentOffline,
}

/// Shared connectivity state. Clones observe the same status.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    status: Arc<watch::Sender<ConnectivityStatus>>,
    persistence: Option<Arc<LocalCacheStore>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: ConnectivityStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            status: Arc::new(status),
            persistence: None,
        }
    }

    /// Start from the status remembered in `cache` (online when nothing is
    /// stored) and remember every later transition there.
    pub fn restored(cache: Arc<LocalCacheStore>) -> Self {
        let initial = match cache.read::<ConnectivityStatus>(LAST_STATUS_KEY) {
            Ok(Some(payload)) => payload.data,
            Ok(None) => ConnectivityStatus::Online,
            Err(error) => {
                tracing::warn!("Ignoring unreadable connectivity status: {}", error);
                ConnectivityStatus::Online
            }
        };
        let mut monitor = Self::new(initial);
        monitor.persistence = Some(cache);
        monitor
    }

    pub fn status(&self) -> ConnectivityStatus {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    /// Record a reading. Returns the transition it caused, if any.
    pub fn report(&self, reading: ConnectivityStatus) -> Option<ConnectivityEvent> {
        let changed = self.status.send_if_modified(|current| {
            if *current == reading {
                false
            } else {
                *current = reading;
                true
            }
        });
        if !changed {
            return None;
        }

        if let Some(cache) = &self.persistence {
            if let Err(error) = cache.write(LAST_STATUS_KEY, &reading, false) {
                tracing::warn!("Failed to remember connectivity status: {}", error);
            }
        }

        let event = match reading {
            ConnectivityStatus::Online => {
                tracing::info!("Network: online");
                ConnectivityEvent::WentOnline
            }
            ConnectivityStatus::Offline => {
                tracing::warn!("Network: offline");
                ConnectivityEvent::WentOffline
            }
        };
        Some(event)
    }

    /// Convenience for hosts that only know a boolean
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        self.report(ConnectivityStatus::from_online(online))
    }

    /// Sample `probe` and record the result
    pub async fn refresh<P: ConnectivityProbe>(&self, probe: &P) -> Option<ConnectivityEvent> {
        let reading = probe.probe().await;
        self.report(reading)
    }

    /// Receiver woken on every status change
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.status.subscribe()
    }
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Source of connectivity readings
#[allow(async_fn_in_trait)]
pub trait ConnectivityProbe {
    async fn probe(&self) -> ConnectivityStatus;
}

/// Probe that issues a GET and treats any HTTP response as online.
///
/// Transport errors and timeouts count as offline; a 4xx/5xx still proves
/// the network path works.
#[derive(Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> ConnectivityStatus {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                tracing::debug!("Probe {} answered {}", self.url, response.status());
                ConnectivityStatus::Online
            }
            Err(error) => {
                tracing::debug!("Probe {} failed: {}", self.url, error);
                ConnectivityStatus::Offline
            }
        }
    }
}

/// Probe that always returns a fixed reading (forced offline mode, tests)
#[derive(Clone, Copy, Debug)]
pub struct FixedProbe(pub ConnectivityStatus);

impl ConnectivityProbe for FixedProbe {
    async fn probe(&self) -> ConnectivityStatus {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStorage;

    #[test]
    fn repeated_readings_emit_no_events() {
        let monitor = ConnectivityMonitor::new(ConnectivityStatus::Online);
        assert_eq!(monitor.set_online(true), None);
        assert_eq!(monitor.set_online(false), Some(ConnectivityEvent::WentOffline));
        assert_eq!(monitor.set_online(false), None);
        assert_eq!(monitor.set_online(true), Some(ConnectivityEvent::WentOnline));
        assert!(monitor.is_online());
    }

    #[test]
    fn clones_share_status() {
        let monitor = ConnectivityMonitor::new(ConnectivityStatus::Offline);
        let other = monitor.clone();
        monitor.set_online(true);
        assert!(other.is_online());
    }

    #[tokio::test]
    async fn subscribers_see_each_transition_once() {
        let monitor = ConnectivityMonitor::new(ConnectivityStatus::Online);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(false);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectivityStatus::Offline);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn refresh_uses_probe_reading() {
        let monitor = ConnectivityMonitor::new(ConnectivityStatus::Online);
        let event = monitor
            .refresh(&FixedProbe(ConnectivityStatus::Offline))
            .await;
        assert_eq!(event, Some(ConnectivityEvent::WentOffline));
        assert_eq!(
            monitor.refresh(&FixedProbe(ConnectivityStatus::Offline)).await,
            None
        );
    }

    #[test]
    fn restored_monitor_remembers_last_status() {
        let cache =
            Arc::new(LocalCacheStore::new(Arc::new(MemoryStorage::new()), "conn").unwrap());

        let monitor = ConnectivityMonitor::restored(cache.clone());
        assert!(monitor.is_online());
        monitor.set_online(false);

        let next_run = ConnectivityMonitor::restored(cache);
        assert_eq!(next_run.status(), ConnectivityStatus::Offline);
        assert_eq!(next_run.set_online(true), Some(ConnectivityEvent::WentOnline));
    }
}
