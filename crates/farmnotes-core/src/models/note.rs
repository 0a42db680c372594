//! Note model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::today;

/// Prefix carried by ids generated on this device before the server has seen the note.
pub const PROVISIONAL_ID_PREFIX: &str = "local-";

/// Opaque note identifier.
///
/// Server ids are whatever the remote store assigns. Ids minted locally while
/// offline start with [`PROVISIONAL_ID_PREFIX`] followed by a UUID v7, so they
/// sort by creation time and can never collide with a server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Create a new provisional id for a note created offline
    #[must_use]
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id was generated locally and not yet replaced by a server id
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_ID_PREFIX)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput("note id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Server id, or a provisional id while the create is queued
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Calendar date the note refers to
    pub note_date: NaiveDate,
    pub is_completed: bool,
    /// Set iff `is_completed`
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    pub institution_id: Option<String>,
}

impl Note {
    /// Build a note for an offline create.
    ///
    /// Ownership fields come from whatever is known about the actor locally;
    /// the server-assigned values replace them once the create is replayed.
    #[must_use]
    pub fn provisional(
        draft: NoteDraft,
        user_id: impl Into<String>,
        institution_id: Option<String>,
    ) -> Self {
        let draft = draft.normalized();
        let now = Utc::now();
        Self {
            id: NoteId::provisional(),
            title: draft.title,
            content: draft.content,
            note_date: draft.note_date,
            is_completed: draft.is_completed,
            completed_date: draft.completed_date,
            created_at: now,
            updated_at: now,
            user_id: user_id.into(),
            institution_id,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }

    /// Check the completion invariant
    pub const fn completion_is_consistent(&self) -> bool {
        self.is_completed == self.completed_date.is_some()
    }

    /// Shallow-merge a set of changes into this note.
    ///
    /// Does not touch `updated_at`; callers decide whether the merge is a
    /// local edit or a server echo.
    pub fn apply_changes(&mut self, changes: &NoteChanges) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &changes.content {
            self.content.clone_from(content);
        }
        if let Some(note_date) = changes.note_date {
            self.note_date = note_date;
        }
        if let Some(is_completed) = changes.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(completed_date) = changes.completed_date {
            self.completed_date = completed_date;
        }
    }
}

/// Sort notes newest `note_date` first, then most recently created; full ties keep
/// their current order.
pub fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.note_date
            .cmp(&a.note_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Input for creating a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub note_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
}

impl NoteDraft {
    /// Create an open (not completed) draft
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>, note_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            note_date,
            is_completed: false,
            completed_date: None,
        }
    }

    /// Mark the draft as already completed
    #[must_use]
    pub const fn completed(mut self, completed_date: Option<NaiveDate>) -> Self {
        self.is_completed = true;
        self.completed_date = completed_date;
        self
    }

    /// Enforce the completion invariant: a completed draft gets today's date
    /// when none was given, an open draft never carries one.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.is_completed {
            self.completed_date = Some(self.completed_date.unwrap_or_else(today));
        } else {
            self.completed_date = None;
        }
        self
    }
}

/// A partial update. Only fields set to `Some` are changed or sent remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// `Some(None)` clears the date
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub completed_date: Option<Option<NaiveDate>>,
}

/// Keep an explicit `null` distinct from a missing field.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl NoteChanges {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub const fn note_date(mut self, note_date: NaiveDate) -> Self {
        self.note_date = Some(note_date);
        self
    }

    #[must_use]
    pub const fn is_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = Some(is_completed);
        self
    }

    #[must_use]
    pub const fn completed_date(mut self, completed_date: Option<NaiveDate>) -> Self {
        self.completed_date = Some(completed_date);
        self
    }

    /// Changes that flip completion on `note`, stamping or clearing the date
    #[must_use]
    pub fn toggle(note: &Note) -> Self {
        let is_completed = !note.is_completed;
        Self::default()
            .is_completed(is_completed)
            .completed_date(is_completed.then(today))
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.note_date.is_none()
            && self.is_completed.is_none()
            && self.completed_date.is_none()
    }

    /// Adjust `completed_date` so that applying these changes to `current`
    /// keeps the completion invariant. Changes that do not touch completion
    /// state are returned as-is.
    #[must_use]
    pub fn normalized_for(mut self, current: &Note) -> Self {
        let completed = self.is_completed.unwrap_or(current.is_completed);
        let resulting_date = self.completed_date.unwrap_or(current.completed_date);

        if completed && resulting_date.is_none() {
            self.completed_date = Some(Some(current.completed_date.unwrap_or_else(today)));
        } else if !completed && resulting_date.is_some() {
            self.completed_date = Some(None);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_note() -> Note {
        Note::provisional(
            NoteDraft::new("Fence", "Fix the north fence", date(2024, 5, 1)),
            "user-1",
            Some("farm-1".to_string()),
        )
    }

    #[test]
    fn provisional_ids_are_prefixed_and_unique() {
        let a = NoteId::provisional();
        let b = NoteId::provisional();
        assert!(a.is_provisional());
        assert!(a.as_str().starts_with(PROVISIONAL_ID_PREFIX));
        assert_ne!(a, b);
        assert!(!NoteId::from("7f3c2a").is_provisional());
    }

    #[test]
    fn note_id_parse_rejects_empty() {
        assert!("  ".parse::<NoteId>().is_err());
        assert_eq!("abc ".parse::<NoteId>().unwrap(), NoteId::from("abc"));
    }

    #[test]
    fn provisional_note_copies_draft_and_ownership() {
        let note = sample_note();
        assert!(note.is_provisional());
        assert_eq!(note.title, "Fence");
        assert_eq!(note.user_id, "user-1");
        assert_eq!(note.institution_id.as_deref(), Some("farm-1"));
        assert_eq!(note.created_at, note.updated_at);
        assert!(note.completion_is_consistent());
    }

    #[test]
    fn draft_normalization_enforces_completion_invariant() {
        let open = NoteDraft {
            completed_date: Some(date(2024, 1, 1)),
            ..NoteDraft::new("a", "b", date(2024, 1, 1))
        };
        assert_eq!(open.normalized().completed_date, None);

        let done = NoteDraft::new("a", "b", date(2024, 1, 1)).completed(None);
        assert!(done.normalized().completed_date.is_some());

        let dated = NoteDraft::new("a", "b", date(2024, 1, 1)).completed(Some(date(2024, 2, 2)));
        assert_eq!(dated.normalized().completed_date, Some(date(2024, 2, 2)));
    }

    #[test]
    fn toggle_sets_and_clears_completed_date() {
        let mut note = sample_note();

        let changes = NoteChanges::toggle(&note);
        note.apply_changes(&changes);
        assert!(note.is_completed);
        assert!(note.completed_date.is_some());

        let changes = NoteChanges::toggle(&note);
        note.apply_changes(&changes);
        assert!(!note.is_completed);
        assert_eq!(note.completed_date, None);
    }

    #[test]
    fn title_only_changes_stay_title_only() {
        let note = sample_note();
        let changes = NoteChanges::default().title("New").normalized_for(&note);
        assert_eq!(changes, NoteChanges::default().title("New"));
    }

    #[test]
    fn completing_through_update_stamps_a_date() {
        let note = sample_note();
        let changes = NoteChanges::default()
            .is_completed(true)
            .normalized_for(&note);
        assert!(matches!(changes.completed_date, Some(Some(_))));

        let mut merged = note;
        merged.apply_changes(&changes);
        assert!(merged.completion_is_consistent());
    }

    #[test]
    fn reopening_through_update_clears_the_date() {
        let mut note = sample_note();
        note.apply_changes(&NoteChanges::toggle(&note));

        let changes = NoteChanges::default()
            .is_completed(false)
            .normalized_for(&note);
        assert_eq!(changes.completed_date, Some(None));
    }

    #[test]
    fn stray_completed_date_on_open_note_is_cleared() {
        let note = sample_note();
        let changes = NoteChanges::default()
            .completed_date(Some(date(2024, 3, 3)))
            .normalized_for(&note);
        assert_eq!(changes.completed_date, Some(None));
    }

    #[test]
    fn sort_is_newest_first_then_latest_created_and_stable() {
        let created = sample_note().created_at;
        let mut a = sample_note();
        a.title = "a".into();
        a.created_at = created;
        let mut b = sample_note();
        b.title = "b".into();
        b.created_at = created;
        let mut c = sample_note();
        c.title = "c".into();
        c.note_date = date(2024, 6, 1);
        let mut d = sample_note();
        d.title = "d".into();
        d.created_at = created + chrono::TimeDelta::minutes(5);

        let mut notes = vec![a, b, c, d];
        sort_newest_first(&mut notes);
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn explicit_null_survives_serialization() {
        let changes = NoteChanges::default().completed_date(None);
        let raw = serde_json::to_string(&changes).unwrap();
        assert_eq!(raw, r#"{"completedDate":null}"#);
        let parsed: NoteChanges = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, changes);

        let missing: NoteChanges = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.completed_date, None);
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(NoteChanges::default().is_empty());
        assert!(!NoteChanges::default().content("x").is_empty());
    }
}
