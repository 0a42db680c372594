//! Offline-first notes repository

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::operation::{rebase, NoteOperation};
use crate::auth::{Actor, ActorProvider};
use crate::cache::LocalCacheStore;
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityStatus};
use crate::error::{Error, Result};
use crate::models::{
    sort_newest_first, NewNoteRow, Note, NoteChanges, NoteChangesRow, NoteDraft, NoteFilter,
    NoteId,
};
use crate::remote::{RemoteError, RemoteNoteStore};
use crate::sync::{OperationLog, SyncCoordinator, SyncOutcome, SyncState};

/// Cache key of the notes collection
pub const NOTES_COLLECTION: &str = "notes";

/// Cache key remembering the actor's institution from the last profile lookup
const INSTITUTION_KEY: &str = "profile:institution";

/// Everything persisted for the collection, written as one cache payload so
/// the list and its queue can never drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotesSnapshot {
    notes: Vec<Note>,
    #[serde(default)]
    operations: OperationLog<NoteOperation>,
    /// Provisional id -> server id, for callers still holding an old id
    #[serde(default)]
    id_map: BTreeMap<NoteId, NoteId>,
    /// Operations were pushed but the remote list has not been reloaded yet
    #[serde(default)]
    needs_reload: bool,
}

impl NotesSnapshot {
    fn resolve(&self, id: &NoteId) -> NoteId {
        self.id_map.get(id).unwrap_or(id).clone()
    }

    fn find(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    fn find_mut(&mut self, id: &NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| &note.id == id)
    }

    fn replace(&mut self, note: Note) {
        if let Some(existing) = self.find_mut(&note.id) {
            *existing = note;
        }
    }

    fn is_dirty(&self) -> bool {
        self.needs_reload || !self.operations.is_empty()
    }
}

/// What happened when a queued operation was pushed
enum Pushed {
    Created(Note),
    Updated(Note),
    Deleted,
    /// The record is gone remotely; the operation is obsolete
    Stale,
}

/// Notes CRUD over a remote store with a local, offline-capable mirror.
///
/// Online, writes go to the remote first and only the server echo is
/// committed locally. Offline, writes land in the local list and an ordered
/// operation log; reconnecting replays that log before reloading.
///
/// Every change to the in-memory list is committed to the cache inside one
/// lock section with no await in between.
pub struct NotesRepository<R, A> {
    remote: R,
    actors: A,
    cache: Arc<LocalCacheStore>,
    monitor: ConnectivityMonitor,
    coordinator: SyncCoordinator,
    state: Mutex<NotesSnapshot>,
}

impl<R: RemoteNoteStore, A: ActorProvider> NotesRepository<R, A> {
    /// Build a repository, hydrating the list and queue from `cache`
    pub fn new(
        remote: R,
        actors: A,
        cache: Arc<LocalCacheStore>,
        monitor: ConnectivityMonitor,
    ) -> Result<Self> {
        let snapshot = cache
            .read::<NotesSnapshot>(NOTES_COLLECTION)?
            .map(|payload| payload.data)
            .unwrap_or_default();
        tracing::debug!(
            "Loaded {} cached notes ({} queued operations)",
            snapshot.notes.len(),
            snapshot.operations.len()
        );

        Ok(Self {
            remote,
            actors,
            coordinator: SyncCoordinator::new(cache.clone()),
            cache,
            monitor,
            state: Mutex::new(snapshot),
        })
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub fn has_pending_sync(&self) -> bool {
        self.cache.is_pending(NOTES_COLLECTION)
    }

    pub fn sync_state(&self) -> SyncState {
        self.coordinator.state(NOTES_COLLECTION)
    }

    /// Number of operations waiting for replay
    pub fn pending_operations(&self) -> usize {
        self.lock_state()
            .map(|state| state.operations.len())
            .unwrap_or(0)
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Pure lookup in the local list; stale provisional ids are resolved
    pub fn get_by_id(&self, id: &NoteId) -> Option<Note> {
        let state = self.lock_state().ok()?;
        let id = state.resolve(id);
        state.find(&id).cloned()
    }

    /// The local list, newest first, without any I/O
    pub fn cached(&self) -> Vec<Note> {
        let mut notes = self
            .lock_state()
            .map(|state| state.notes.clone())
            .unwrap_or_default();
        sort_newest_first(&mut notes);
        notes
    }

    /// Local notes matching `filter`, newest first
    pub fn filtered(&self, filter: &NoteFilter) -> Vec<Note> {
        filter.apply(&self.cached())
    }

    /// Notes newest first.
    ///
    /// Online this pushes queued work, then reloads from the remote store
    /// and overwrites the cache. Offline it returns the cached list. A failed
    /// replay is logged and its operations stay queued on top of the reload.
    pub async fn list(&self) -> Result<Vec<Note>> {
        if !self.is_online() {
            return Ok(self.cached());
        }

        if self.has_pending_sync() {
            match self.sync_data().await {
                // A completed replay already ends with a reload
                Ok(SyncOutcome::Synced) => return Ok(self.cached()),
                Ok(SyncOutcome::AlreadyClean | SyncOutcome::InFlight) => {}
                Err(error) => {
                    tracing::warn!("Sync before listing failed, queued work kept: {}", error);
                }
            }
            // A transport failure during replay flips the monitor offline
            if !self.is_online() {
                return Ok(self.cached());
            }
        }

        self.reload().await?;
        Ok(self.cached())
    }

    pub async fn add(&self, draft: NoteDraft) -> Result<Note> {
        let draft = draft.normalized();
        if !self.is_online() {
            return self.add_offline(draft);
        }

        let actor = self.actors.current_actor().ok_or(Error::AuthRequired)?;
        let institution_id = self.institution_for(&actor).await?;
        let row = NewNoteRow::from_draft(draft, actor.user_id, institution_id);
        let created: Note = self
            .remote
            .insert_note(&row)
            .await
            .map_err(|error| self.write_failed("create note", error))?
            .into();

        self.commit(|state| state.notes.insert(0, created.clone()))?;
        tracing::info!("Created note {}", created.id);
        Ok(created)
    }

    fn add_offline(&self, draft: NoteDraft) -> Result<Note> {
        let user_id = self
            .actors
            .current_actor()
            .map(|actor| actor.user_id)
            .unwrap_or_default();
        let note = Note::provisional(draft, user_id, self.cached_institution());

        self.commit(|state| {
            state.notes.insert(0, note.clone());
            state.operations.push(NoteOperation::Create { note: note.clone() });
        })?;
        tracing::info!("Queued offline create {}", note.id);
        Ok(note)
    }

    /// Apply `changes` to the note. A missing id is a no-op returning `None`.
    pub async fn update(&self, id: &NoteId, changes: NoteChanges) -> Result<Option<Note>> {
        let Some(current) = self.get_by_id(id) else {
            tracing::debug!("Update skipped, note {} not found", id);
            return Ok(None);
        };
        let changes = changes.normalized_for(&current);
        if changes.is_empty() {
            return Ok(Some(current));
        }

        // Edits to a note with queued work (including a provisional note's
        // create) wait behind it so the log replays in order
        if !self.is_online() || self.has_queued_work(&current.id)? {
            return self.update_offline(&current.id, &changes);
        }

        let updated: Note = self
            .remote
            .update_note(&current.id, &NoteChangesRow::from(&changes))
            .await
            .map_err(|error| self.write_failed("update note", error))?
            .into();

        self.commit(|state| state.replace(updated.clone()))?;
        tracing::debug!("Updated note {}", updated.id);
        Ok(Some(updated))
    }

    fn has_queued_work(&self, id: &NoteId) -> Result<bool> {
        Ok(id.is_provisional()
            || self
                .lock_state()?
                .operations
                .iter()
                .any(|operation| operation.targets(id)))
    }

    fn update_offline(&self, id: &NoteId, changes: &NoteChanges) -> Result<Option<Note>> {
        let updated = self.commit(|state| {
            let note = state.find_mut(id)?;
            note.apply_changes(changes);
            note.updated_at = Utc::now();
            let updated = note.clone();
            state.operations.push(NoteOperation::Update {
                id: id.clone(),
                changes: changes.clone(),
            });
            Some(updated)
        })?;
        if updated.is_some() {
            tracing::info!("Queued offline update of {}", id);
        }
        Ok(updated)
    }

    /// Flip completion, stamping or clearing `completed_date`
    pub async fn toggle_complete(&self, id: &NoteId) -> Result<Option<Note>> {
        let Some(current) = self.get_by_id(id) else {
            return Ok(None);
        };
        self.update(&current.id, NoteChanges::toggle(&current)).await
    }

    /// Delete a note.
    ///
    /// Online the remote delete runs first and its failure leaves the local
    /// list untouched.
    pub async fn delete(&self, id: &NoteId) -> Result<()> {
        let id = self.lock_state()?.resolve(id);

        if !self.is_online() || id.is_provisional() {
            return self.delete_offline(&id);
        }

        self.remote
            .delete_note(&id)
            .await
            .map_err(|error| self.write_failed("delete note", error))?;

        self.commit(|state| {
            state.notes.retain(|note| note.id != id);
            state.operations.retain(|operation| !operation.targets(&id));
        })?;
        tracing::info!("Deleted note {}", id);
        Ok(())
    }

    fn delete_offline(&self, id: &NoteId) -> Result<()> {
        let removed = self.commit(|state| {
            let before = state.notes.len();
            state.notes.retain(|note| &note.id != id);
            if state.notes.len() == before {
                return false;
            }

            let dropped = state.operations.retain(|operation| !operation.targets(id));
            if id.is_provisional() {
                tracing::debug!("Dropped {} queued operations for {}", dropped, id);
            } else {
                state.operations.push(NoteOperation::Delete { id: id.clone() });
            }
            true
        })?;

        if removed {
            tracing::info!("Deleted note {} locally", id);
        } else {
            tracing::debug!("Delete skipped, note {} not found locally", id);
        }
        Ok(())
    }

    /// Push queued operations and reload; a no-op when nothing is pending
    pub async fn sync_data(&self) -> Result<SyncOutcome> {
        self.coordinator
            .sync(NOTES_COLLECTION, || self.replay())
            .await
    }

    /// React to a connectivity transition. Only going online does anything.
    pub async fn handle_connectivity_event(
        &self,
        event: ConnectivityEvent,
    ) -> Result<Option<SyncOutcome>> {
        match event {
            ConnectivityEvent::WentOnline if self.has_pending_sync() => {
                tracing::info!("Back online with queued changes, syncing");
                self.sync_data().await.map(Some)
            }
            ConnectivityEvent::WentOnline | ConnectivityEvent::WentOffline => Ok(None),
        }
    }

    /// Sync on every offline to online transition until `cancel` fires.
    ///
    /// Failures are logged and left for the next transition.
    pub async fn run_auto_sync(&self, cancel: CancellationToken) {
        let mut status = self.monitor.subscribe();
        let mut last = *status.borrow_and_update();

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *status.borrow_and_update();
                    let went_online = last == ConnectivityStatus::Offline
                        && current == ConnectivityStatus::Online;
                    last = current;
                    if !went_online {
                        continue;
                    }
                    if let Err(error) = self
                        .handle_connectivity_event(ConnectivityEvent::WentOnline)
                        .await
                    {
                        tracing::warn!("Automatic sync failed: {}", error);
                    }
                }
            }
        }
        tracing::debug!("Auto-sync stopped");
    }

    async fn replay(&self) -> Result<()> {
        if !self.is_online() {
            return Err(Error::Offline);
        }

        loop {
            let front = self
                .lock_state()?
                .operations
                .front()
                .map(|queued| queued.operation.clone());
            let Some(operation) = front else {
                break;
            };

            let pushed = self.push(&operation).await?;
            self.commit(|state| settle(state, &operation, pushed))?;
        }

        self.reload().await
    }

    async fn push(&self, operation: &NoteOperation) -> Result<Pushed> {
        match operation {
            NoteOperation::Create { note } => {
                let actor = self.actors.current_actor().ok_or(Error::AuthRequired)?;
                let institution_id = self.institution_for(&actor).await?;
                let row = NewNoteRow::from_draft(NoteDraft::from(note), actor.user_id, institution_id);
                let created = self
                    .remote
                    .insert_note(&row)
                    .await
                    .map_err(|error| self.write_failed("replay create", error))?;
                Ok(Pushed::Created(created.into()))
            }
            NoteOperation::Update { id, changes } => {
                match self
                    .remote
                    .update_note(id, &NoteChangesRow::from(changes))
                    .await
                {
                    Ok(row) => Ok(Pushed::Updated(row.into())),
                    Err(RemoteError::NotFound(_)) => {
                        tracing::warn!("Dropping queued update of {}: gone remotely", id);
                        Ok(Pushed::Stale)
                    }
                    Err(error) => Err(self.write_failed("replay update", error)),
                }
            }
            NoteOperation::Delete { id } => match self.remote.delete_note(id).await {
                Ok(()) => Ok(Pushed::Deleted),
                Err(RemoteError::NotFound(_)) => {
                    tracing::warn!("Dropping queued delete of {}: gone remotely", id);
                    Ok(Pushed::Stale)
                }
                Err(error) => Err(self.write_failed("replay delete", error)),
            },
        }
    }

    /// Replace the local list with the remote one, rebased onto anything
    /// still queued
    async fn reload(&self) -> Result<()> {
        let rows = self
            .remote
            .fetch_notes()
            .await
            .map_err(|error| self.read_failed("load notes", error))?;
        let mut fresh: Vec<Note> = rows.into_iter().map(Note::from).collect();
        sort_newest_first(&mut fresh);

        let count = fresh.len();
        self.commit(|state| {
            rebase(&mut fresh, &state.operations);
            state.notes = fresh;
            state.needs_reload = false;
        })?;
        tracing::debug!("Reloaded {} notes from remote", count);
        Ok(())
    }

    async fn institution_for(&self, actor: &Actor) -> Result<String> {
        let institution = self
            .actors
            .institution_id(actor)
            .await
            .map_err(|error| self.read_failed("look up profile", error))?;
        let Some(institution) = institution else {
            tracing::warn!("User {} has no institution assigned", actor.user_id);
            return Err(Error::NoInstitution);
        };

        if self.cached_institution().as_deref() != Some(institution.as_str()) {
            if let Err(error) = self.cache.write(INSTITUTION_KEY, &institution, false) {
                tracing::warn!("Failed to remember institution: {}", error);
            }
        }
        Ok(institution)
    }

    fn cached_institution(&self) -> Option<String> {
        match self.cache.read::<String>(INSTITUTION_KEY) {
            Ok(payload) => payload.map(|payload| payload.data),
            Err(error) => {
                tracing::warn!("Ignoring unreadable cached institution: {}", error);
                None
            }
        }
    }

    /// Read-modify-write the snapshot and persist it in one critical section.
    ///
    /// `mutate` runs on a copy; memory is only updated once the cache write
    /// succeeded, so a failed write leaves both untouched.
    fn commit<T>(&self, mutate: impl FnOnce(&mut NotesSnapshot) -> T) -> Result<T> {
        let mut state = self.lock_state()?;
        let mut next = state.clone();
        let result = mutate(&mut next);
        if next == *state {
            return Ok(result);
        }

        self.cache
            .write(NOTES_COLLECTION, &next, next.is_dirty())
            .inspect_err(|error| tracing::warn!("Failed to persist notes: {}", error))?;
        *state = next;
        Ok(result)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, NotesSnapshot>> {
        self.state
            .lock()
            .map_err(|error| Error::Storage(format!("notes state lock poisoned: {error}")))
    }

    fn write_failed(&self, action: &str, error: RemoteError) -> Error {
        tracing::error!("Failed to {}: {}", action, error);
        self.note_transport_failure(&error);
        match error {
            RemoteError::NotFound(id) => Error::NotFound(id),
            other => Error::RemoteWriteFailed(other.to_string()),
        }
    }

    fn read_failed(&self, action: &str, error: RemoteError) -> Error {
        tracing::warn!("Failed to {}: {}", action, error);
        self.note_transport_failure(&error);
        Error::RemoteReadFailed(error.to_string())
    }

    fn note_transport_failure(&self, error: &RemoteError) {
        if error.is_transport() {
            self.monitor.report(ConnectivityStatus::Offline);
        }
    }
}

/// Fold the result of pushing `operation` back into the snapshot
fn settle(state: &mut NotesSnapshot, operation: &NoteOperation, pushed: Pushed) {
    let still_queued = state
        .operations
        .front()
        .is_some_and(|queued| &queued.operation == operation);
    if still_queued {
        state.operations.pop_front();
    }
    state.needs_reload = true;

    match pushed {
        Pushed::Created(server) => {
            let provisional = operation.note_id().clone();
            if still_queued {
                if let Some(local) = state.find_mut(&provisional) {
                    local.id = server.id.clone();
                    local.created_at = server.created_at;
                    local.user_id.clone_from(&server.user_id);
                    local.institution_id.clone_from(&server.institution_id);
                }
                state
                    .operations
                    .for_each_mut(|queued| queued.rename(&provisional, &server.id));
            } else {
                // Deleted locally while the insert was in flight
                state.operations.push(NoteOperation::Delete {
                    id: server.id.clone(),
                });
            }
            tracing::info!("Replayed create {} as {}", provisional, server.id);
            state.id_map.insert(provisional, server.id);
        }
        Pushed::Updated(server) => {
            let id = server.id.clone();
            if !state.operations.iter().any(|queued| queued.targets(&id)) {
                state.replace(server);
            }
            tracing::debug!("Replayed update of {}", id);
        }
        Pushed::Deleted => {
            tracing::debug!("Replayed delete of {}", operation.note_id());
        }
        Pushed::Stale => {}
    }
}
