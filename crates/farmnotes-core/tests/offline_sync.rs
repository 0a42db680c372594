use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use farmnotes_core::auth::{Actor, ActorProvider};
use farmnotes_core::cache::{KeyValueStorage, LocalCacheStore, MemoryStorage};
use farmnotes_core::connectivity::{ConnectivityMonitor, ConnectivityStatus};
use farmnotes_core::models::{NewNoteRow, NoteChangesRow, NoteRow};
use farmnotes_core::remote::{RemoteError, RemoteNoteStore, RemoteResult};
use farmnotes_core::sync::{SyncOutcome, SyncState};
use farmnotes_core::{Error, NoteChanges, NoteDraft, NoteId, NotesRepository};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct FakeState {
    rows: Vec<NoteRow>,
    next_id: u32,
    fetches: usize,
    inserts: usize,
    updates: usize,
    deletes: usize,
    update_payloads: Vec<serde_json::Value>,
    fail_writes: bool,
    fail_reads: bool,
    actor: Option<String>,
    institution: Option<String>,
}

/// In-process remote store and actor provider with call accounting
#[derive(Clone, Default)]
struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRemote {
    fn signed_in() -> Self {
        let remote = Self::default();
        {
            let mut state = remote.state.lock().unwrap();
            state.actor = Some("user-1".to_string());
            state.institution = Some("farm-1".to_string());
        }
        remote
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    fn calls(&self) -> usize {
        self.with(|state| state.fetches + state.inserts + state.updates + state.deletes)
    }

    fn titles(&self) -> Vec<String> {
        self.with(|state| state.rows.iter().map(|row| row.title.clone()).collect())
    }

    fn seed(&self, title: &str, note_date: NaiveDate) -> NoteId {
        self.with(|state| {
            state.next_id += 1;
            let id = format!("srv-{}", state.next_id);
            let now = Utc::now();
            state.rows.push(NoteRow {
                id: id.clone(),
                title: title.to_string(),
                content: Some(String::new()),
                note_date,
                is_completed: false,
                completed_date: None,
                created_at: now,
                updated_at: now,
                user_id: "user-1".to_string(),
                institution_id: Some("farm-1".to_string()),
            });
            NoteId::from(id)
        })
    }
}

fn unavailable() -> RemoteError {
    RemoteError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl RemoteNoteStore for FakeRemote {
    async fn fetch_notes(&self) -> RemoteResult<Vec<NoteRow>> {
        self.with(|state| {
            state.fetches += 1;
            if state.fail_reads {
                return Err(unavailable());
            }
            let mut rows = state.rows.clone();
            rows.sort_by(|a, b| b.note_date.cmp(&a.note_date));
            Ok(rows)
        })
    }

    async fn insert_note(&self, row: &NewNoteRow) -> RemoteResult<NoteRow> {
        self.with(|state| {
            state.inserts += 1;
            if state.fail_writes {
                return Err(unavailable());
            }
            state.next_id += 1;
            let now = Utc::now();
            let stored = NoteRow {
                id: format!("srv-{}", state.next_id),
                title: row.title.clone(),
                content: Some(row.content.clone()),
                note_date: row.note_date,
                is_completed: row.is_completed,
                completed_date: row.completed_date,
                created_at: now,
                updated_at: now,
                user_id: row.user_id.clone(),
                institution_id: Some(row.institution_id.clone()),
            };
            state.rows.push(stored.clone());
            Ok(stored)
        })
    }

    async fn update_note(&self, id: &NoteId, changes: &NoteChangesRow) -> RemoteResult<NoteRow> {
        self.with(|state| {
            state.updates += 1;
            if state.fail_writes {
                return Err(unavailable());
            }
            state
                .update_payloads
                .push(serde_json::to_value(changes).unwrap());
            let row = state
                .rows
                .iter_mut()
                .find(|row| row.id == id.as_str())
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
            if let Some(title) = &changes.title {
                row.title.clone_from(title);
            }
            if let Some(content) = &changes.content {
                row.content = Some(content.clone());
            }
            if let Some(note_date) = changes.note_date {
                row.note_date = note_date;
            }
            if let Some(is_completed) = changes.is_completed {
                row.is_completed = is_completed;
            }
            if let Some(completed_date) = changes.completed_date {
                row.completed_date = completed_date;
            }
            row.updated_at = Utc::now();
            Ok(row.clone())
        })
    }

    async fn delete_note(&self, id: &NoteId) -> RemoteResult<()> {
        self.with(|state| {
            state.deletes += 1;
            if state.fail_writes {
                return Err(unavailable());
            }
            let before = state.rows.len();
            state.rows.retain(|row| row.id != id.as_str());
            if state.rows.len() == before {
                Err(RemoteError::NotFound(id.to_string()))
            } else {
                Ok(())
            }
        })
    }
}

impl ActorProvider for FakeRemote {
    fn current_actor(&self) -> Option<Actor> {
        self.with(|state| state.actor.clone().map(Actor::new))
    }

    async fn institution_id(&self, _actor: &Actor) -> RemoteResult<Option<String>> {
        Ok(self.with(|state| state.institution.clone()))
    }
}

struct Harness {
    remote: FakeRemote,
    storage: Arc<dyn KeyValueStorage>,
    monitor: ConnectivityMonitor,
    repo: NotesRepository<FakeRemote, FakeRemote>,
}

impl Harness {
    fn new(remote: FakeRemote, status: ConnectivityStatus) -> Self {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        Self::with_storage(remote, status, storage)
    }

    fn with_storage(
        remote: FakeRemote,
        status: ConnectivityStatus,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let cache = Arc::new(LocalCacheStore::new(storage.clone(), "farmnotes").unwrap());
        let monitor = ConnectivityMonitor::new(status);
        let repo =
            NotesRepository::new(remote.clone(), remote.clone(), cache, monitor.clone()).unwrap();
        Self {
            remote,
            storage,
            monitor,
            repo,
        }
    }

    /// A fresh repository over the same storage, as after a restart
    fn restarted(&self, status: ConnectivityStatus) -> Self {
        Self::with_storage(self.remote.clone(), status, self.storage.clone())
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn draft(title: &str, day: u32) -> NoteDraft {
    NoteDraft::new(title, "B", date(day))
}

#[tokio::test]
async fn offline_add_then_list_returns_new_note_first() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);

    h.repo.add(draft("First", 10)).await.unwrap();
    let added = h.repo.add(draft("Second", 10)).await.unwrap();

    let notes = h.repo.list().await.unwrap();
    assert_eq!(notes[0].id, added.id);
    assert!(added.id.is_provisional());
    assert!(h.repo.has_pending_sync());
    assert_eq!(h.repo.sync_state(), SyncState::Dirty);
    assert_eq!(h.remote.calls(), 0);
}

#[tokio::test]
async fn list_orders_by_note_date_descending() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    h.repo.add(draft("Later", 20)).await.unwrap();
    h.repo.add(draft("Earlier", 5)).await.unwrap();

    let titles: Vec<_> = h
        .repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|note| note.title)
        .collect();
    assert_eq!(titles, vec!["Later", "Earlier"]);
}

#[tokio::test]
async fn sync_without_pending_changes_makes_no_remote_calls() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Online);
    assert!(!h.repo.has_pending_sync());

    let outcome = h.repo.sync_data().await.unwrap();

    assert_eq!(outcome, SyncOutcome::AlreadyClean);
    assert_eq!(h.remote.calls(), 0);
}

#[tokio::test]
async fn offline_note_is_replayed_before_reload_on_reconnect() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    let provisional = h
        .repo
        .add(NoteDraft::new("A", "B", date(1)))
        .await
        .unwrap();
    assert_eq!(h.repo.list().await.unwrap().len(), 1);
    assert!(h.repo.has_pending_sync());

    let event = h.monitor.set_online(true).unwrap();
    let outcome = h.repo.handle_connectivity_event(event).await.unwrap();
    assert_eq!(outcome, Some(SyncOutcome::Synced));

    let notes = h.repo.list().await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "A");
    assert!(!notes[0].id.is_provisional());
    assert_eq!(notes[0].institution_id.as_deref(), Some("farm-1"));
    assert_eq!(h.remote.titles(), vec!["A".to_string()]);
    assert!(!h.repo.has_pending_sync());
    assert_eq!(h.repo.sync_state(), SyncState::Clean);

    // Callers holding the provisional id still find the note
    let resolved = h.repo.get_by_id(&provisional.id).unwrap();
    assert_eq!(resolved.id, notes[0].id);
}

#[tokio::test]
async fn offline_edits_to_a_provisional_note_follow_its_create() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    let note = h.repo.add(draft("Draft", 3)).await.unwrap();
    h.repo
        .update(&note.id, NoteChanges::default().title("Final"))
        .await
        .unwrap();
    h.repo.toggle_complete(&note.id).await.unwrap();

    h.monitor.set_online(true);
    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::Synced);

    let notes = h.repo.list().await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Final");
    assert!(notes[0].is_completed);
    assert!(notes[0].completed_date.is_some());
    h.remote.with(|state| {
        assert_eq!(state.inserts, 1);
        assert_eq!(state.updates, 2);
    });
}

#[tokio::test]
async fn offline_delete_reaches_remote_on_sync() {
    let remote = FakeRemote::signed_in();
    let id = remote.seed("Old fence", date(2));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    assert_eq!(h.repo.list().await.unwrap().len(), 1);

    h.monitor.set_online(false);
    h.repo.delete(&id).await.unwrap();
    assert!(h.repo.list().await.unwrap().is_empty());
    assert!(h.repo.has_pending_sync());
    assert_eq!(h.remote.titles().len(), 1);

    h.monitor.set_online(true);
    h.repo.sync_data().await.unwrap();

    assert!(h.remote.titles().is_empty());
    assert!(h.repo.list().await.unwrap().is_empty());
    assert!(!h.repo.has_pending_sync());
}

#[tokio::test]
async fn deleting_a_provisional_note_drops_its_queued_work() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    let note = h.repo.add(draft("Oops", 4)).await.unwrap();
    h.repo
        .update(&note.id, NoteChanges::default().content("typo"))
        .await
        .unwrap();

    h.repo.delete(&note.id).await.unwrap();

    assert!(h.repo.get_by_id(&note.id).is_none());
    assert_eq!(h.repo.pending_operations(), 0);
    assert!(!h.repo.has_pending_sync());

    h.monitor.set_online(true);
    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::AlreadyClean);
    assert_eq!(h.remote.calls(), 0);
}

#[tokio::test]
async fn online_delete_of_missing_id_propagates_and_keeps_list() {
    let remote = FakeRemote::signed_in();
    remote.seed("Keep me", date(7));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    let before = h.repo.list().await.unwrap();

    let error = h.repo.delete(&NoteId::from("srv-missing")).await.unwrap_err();

    assert!(matches!(error, Error::NotFound(_)));
    h.remote.with(|state| assert_eq!(state.deletes, 1));
    assert_eq!(h.repo.cached(), before);
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
    let remote = FakeRemote::signed_in();
    let id = remote.seed("Old", date(8));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    h.repo.list().await.unwrap();

    let updated = h
        .repo
        .update(&id, NoteChanges::default().title("New"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.title, "New");
    assert_eq!(h.repo.get_by_id(&id).unwrap().title, "New");
    let payloads = h.remote.with(|state| state.update_payloads.clone());
    assert_eq!(payloads, vec![serde_json::json!({"title": "New"})]);
}

#[tokio::test]
async fn toggle_keeps_completion_invariant_online_and_offline() {
    let remote = FakeRemote::signed_in();
    let id = remote.seed("Irrigation", date(9));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    h.repo.list().await.unwrap();

    let done = h.repo.toggle_complete(&id).await.unwrap().unwrap();
    assert!(done.is_completed);
    assert!(done.completed_date.is_some());

    h.monitor.set_online(false);
    let reopened = h.repo.toggle_complete(&id).await.unwrap().unwrap();
    assert!(!reopened.is_completed);
    assert_eq!(reopened.completed_date, None);

    let marked = h
        .repo
        .update(&id, NoteChanges::default().is_completed(true))
        .await
        .unwrap()
        .unwrap();
    assert!(marked.completed_date.is_some());

    for note in h.repo.cached() {
        assert_eq!(note.is_completed, note.completed_date.is_some());
    }
}

#[tokio::test]
async fn toggle_and_update_of_missing_id_are_no_ops() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Online);
    let missing = NoteId::from("srv-404");

    assert!(h.repo.toggle_complete(&missing).await.unwrap().is_none());
    assert!(h
        .repo
        .update(&missing, NoteChanges::default().title("x"))
        .await
        .unwrap()
        .is_none());
    assert_eq!(h.remote.calls(), 0);
}

#[tokio::test]
async fn online_add_requires_actor_and_institution() {
    let h = Harness::new(FakeRemote::default(), ConnectivityStatus::Online);
    let error = h.repo.add(draft("A", 1)).await.unwrap_err();
    assert!(matches!(error, Error::AuthRequired));

    h.remote
        .with(|state| state.actor = Some("user-2".to_string()));
    let error = h.repo.add(draft("A", 1)).await.unwrap_err();
    assert!(matches!(error, Error::NoInstitution));

    h.remote.with(|state| assert_eq!(state.inserts, 0));
    assert!(h.repo.cached().is_empty());
}

#[tokio::test]
async fn offline_add_skips_auth_but_replay_enforces_it() {
    let h = Harness::new(FakeRemote::default(), ConnectivityStatus::Offline);
    let note = h.repo.add(draft("Anonymous", 2)).await.unwrap();
    assert_eq!(note.user_id, "");

    h.monitor.set_online(true);
    let error = h.repo.sync_data().await.unwrap_err();
    assert!(matches!(error, Error::AuthRequired));
    assert_eq!(h.repo.sync_state(), SyncState::Dirty);
    assert_eq!(h.repo.cached().len(), 1);
}

#[tokio::test]
async fn offline_add_uses_cached_institution() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Online);
    h.repo.add(draft("Online", 1)).await.unwrap();

    h.monitor.set_online(false);
    let offline = h.repo.add(draft("Offline", 1)).await.unwrap();
    assert_eq!(offline.user_id, "user-1");
    assert_eq!(offline.institution_id.as_deref(), Some("farm-1"));
}

#[tokio::test]
async fn online_write_failure_leaves_local_list_unchanged() {
    let remote = FakeRemote::signed_in();
    let id = remote.seed("Stable", date(5));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    let before = h.repo.list().await.unwrap();
    h.remote.with(|state| state.fail_writes = true);

    assert!(matches!(
        h.repo.add(draft("New", 6)).await,
        Err(Error::RemoteWriteFailed(_))
    ));
    assert!(matches!(
        h.repo
            .update(&id, NoteChanges::default().title("Changed"))
            .await,
        Err(Error::RemoteWriteFailed(_))
    ));
    assert!(matches!(
        h.repo.delete(&id).await,
        Err(Error::RemoteWriteFailed(_))
    ));

    assert_eq!(h.repo.cached(), before);
    assert!(!h.repo.has_pending_sync());
}

#[tokio::test]
async fn failed_replay_keeps_local_changes_for_retry() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    h.repo.add(draft("Queued", 11)).await.unwrap();

    h.monitor.set_online(true);
    h.remote.with(|state| state.fail_writes = true);
    assert!(matches!(
        h.repo.sync_data().await,
        Err(Error::RemoteWriteFailed(_))
    ));
    assert_eq!(h.repo.sync_state(), SyncState::Dirty);
    assert_eq!(h.repo.cached()[0].title, "Queued");

    h.remote.with(|state| state.fail_writes = false);
    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::Synced);
    assert_eq!(h.remote.titles(), vec!["Queued".to_string()]);
    assert_eq!(h.repo.sync_state(), SyncState::Clean);
}

#[tokio::test]
async fn failed_reload_after_replay_stays_dirty_and_keeps_notes() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    h.repo.add(draft("Pushed", 12)).await.unwrap();

    h.monitor.set_online(true);
    h.remote.with(|state| state.fail_reads = true);
    assert!(matches!(
        h.repo.sync_data().await,
        Err(Error::RemoteReadFailed(_))
    ));
    assert_eq!(h.repo.pending_operations(), 0);
    assert_eq!(h.repo.sync_state(), SyncState::Dirty);
    assert_eq!(h.repo.cached().len(), 1);
    assert!(!h.repo.cached()[0].id.is_provisional());

    h.remote.with(|state| state.fail_reads = false);
    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::Synced);
    assert_eq!(h.repo.sync_state(), SyncState::Clean);
    h.remote.with(|state| assert_eq!(state.inserts, 1));
}

#[tokio::test]
async fn queued_update_of_a_remotely_deleted_note_is_dropped() {
    let remote = FakeRemote::signed_in();
    let id = remote.seed("Shared", date(13));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    h.repo.list().await.unwrap();

    h.monitor.set_online(false);
    h.repo
        .update(&id, NoteChanges::default().title("Mine"))
        .await
        .unwrap();
    h.remote.with(|state| state.rows.clear());

    h.monitor.set_online(true);
    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::Synced);
    assert!(h.repo.cached().is_empty());
    assert!(!h.repo.has_pending_sync());
}

#[tokio::test]
async fn queued_work_survives_restart() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    let note = h.repo.add(draft("Persisted", 14)).await.unwrap();

    let reopened = h.restarted(ConnectivityStatus::Offline);
    assert!(reopened.repo.has_pending_sync());
    assert_eq!(reopened.repo.get_by_id(&note.id), Some(note));

    reopened.monitor.set_online(true);
    assert_eq!(
        reopened.repo.sync_data().await.unwrap(),
        SyncOutcome::Synced
    );
    assert_eq!(reopened.remote.titles(), vec!["Persisted".to_string()]);
}

#[tokio::test]
async fn auto_sync_runs_on_reconnect_until_cancelled() {
    let h = Harness::new(FakeRemote::signed_in(), ConnectivityStatus::Offline);
    h.repo.add(draft("Auto", 15)).await.unwrap();
    let cancel = CancellationToken::new();

    let runner = h.repo.run_auto_sync(cancel.clone());
    let driver = async {
        tokio::task::yield_now().await;
        h.monitor.set_online(true);
        for _ in 0..100 {
            if !h.repo.has_pending_sync() {
                break;
            }
            tokio::task::yield_now().await;
        }
        cancel.cancel();
    };
    tokio::join!(runner, driver);

    assert!(!h.repo.has_pending_sync());
    assert_eq!(h.remote.titles(), vec!["Auto".to_string()]);
}

/// Online harness with one server note and one offline title edit queued on it
async fn with_queued_edit() -> (Harness, NoteId) {
    let remote = FakeRemote::signed_in();
    let id = remote.seed("Orig", date(16));
    let h = Harness::new(remote, ConnectivityStatus::Online);
    h.repo.list().await.unwrap();

    h.monitor.set_online(false);
    h.repo
        .update(&id, NoteChanges::default().title("Offline edit"))
        .await
        .unwrap();
    h.monitor.set_online(true);
    (h, id)
}

#[tokio::test]
async fn online_update_waits_behind_older_queued_edit() {
    let (h, id) = with_queued_edit().await;

    let updated = h
        .repo
        .update(&id, NoteChanges::default().title("Newest"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Newest");
    assert_eq!(h.repo.pending_operations(), 2);
    h.remote.with(|state| assert_eq!(state.updates, 0));

    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::Synced);
    assert_eq!(h.remote.titles(), vec!["Newest".to_string()]);
    assert_eq!(h.repo.get_by_id(&id).unwrap().title, "Newest");
    assert_eq!(h.repo.sync_state(), SyncState::Clean);
}

#[tokio::test]
async fn online_toggle_waits_behind_older_queued_edit() {
    let (h, id) = with_queued_edit().await;

    let toggled = h.repo.toggle_complete(&id).await.unwrap().unwrap();
    assert!(toggled.is_completed);
    assert_eq!(toggled.title, "Offline edit");
    h.remote.with(|state| assert_eq!(state.updates, 0));

    h.repo.sync_data().await.unwrap();
    h.remote.with(|state| {
        let row = &state.rows[0];
        assert_eq!(row.title, "Offline edit");
        assert!(row.is_completed);
        assert!(row.completed_date.is_some());
    });
}

#[tokio::test]
async fn online_update_of_another_note_goes_straight_to_remote() {
    let (h, queued) = with_queued_edit().await;
    let other = h.remote.seed("Other", date(17));
    h.repo.list().await.unwrap();
    assert_eq!(h.repo.pending_operations(), 0);

    h.monitor.set_online(false);
    h.repo
        .update(&queued, NoteChanges::default().title("Queued again"))
        .await
        .unwrap();
    h.monitor.set_online(true);

    h.repo
        .update(&other, NoteChanges::default().title("Direct"))
        .await
        .unwrap();
    h.remote.with(|state| {
        assert!(state.rows.iter().any(|row| row.title == "Direct"));
        assert!(!state.rows.iter().any(|row| row.title == "Queued again"));
    });
    assert_eq!(h.repo.pending_operations(), 1);
    assert!(h.repo.has_pending_sync());
}

#[tokio::test]
async fn online_delete_supersedes_queued_edits_of_the_note() {
    let (h, id) = with_queued_edit().await;

    h.repo.delete(&id).await.unwrap();
    assert!(h.remote.titles().is_empty());
    assert_eq!(h.repo.pending_operations(), 0);
    assert!(h.repo.get_by_id(&id).is_none());

    assert_eq!(h.repo.sync_data().await.unwrap(), SyncOutcome::AlreadyClean);
    h.remote.with(|state| assert_eq!(state.updates, 0));
}

#[tokio::test]
async fn online_list_reloads_even_when_queued_work_cannot_replay() {
    let remote = FakeRemote::signed_in();
    remote.seed("Server", date(18));
    let h = Harness::new(remote, ConnectivityStatus::Offline);
    let queued = h.repo.add(draft("Stuck", 19)).await.unwrap();

    h.remote.with(|state| state.institution = None);
    h.monitor.set_online(true);

    let titles: Vec<_> = h
        .repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|note| note.title)
        .collect();
    assert_eq!(titles, vec!["Stuck", "Server"]);
    assert!(h.repo.get_by_id(&queued.id).is_some());
    assert_eq!(h.repo.pending_operations(), 1);
    assert_eq!(h.repo.sync_state(), SyncState::Dirty);
    h.remote.with(|state| assert_eq!(state.inserts, 0));
}
