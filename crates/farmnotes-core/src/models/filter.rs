//! Note list filtering

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::note::Note;

/// Completion filter for note lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionFilter {
    #[default]
    All,
    /// Only notes not yet completed
    Pending,
    /// Only completed notes
    Completed,
}

/// Criteria applied to an in-memory note list. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFilter {
    pub status: CompletionFilter,
    /// Case-insensitive substring over title and content
    pub search: Option<String>,
    /// Inclusive lower bound on `note_date`
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `note_date`
    pub to: Option<NaiveDate>,
}

impl NoteFilter {
    #[must_use]
    pub const fn with_status(mut self, status: CompletionFilter) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        let search = search.trim();
        self.search = (!search.is_empty()).then(|| search.to_lowercase());
        self
    }

    #[must_use]
    pub const fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn matches(&self, note: &Note) -> bool {
        let status_ok = match self.status {
            CompletionFilter::All => true,
            CompletionFilter::Pending => !note.is_completed,
            CompletionFilter::Completed => note.is_completed,
        };
        if !status_ok {
            return false;
        }

        if self.from.is_some_and(|from| note.note_date < from)
            || self.to.is_some_and(|to| note.note_date > to)
        {
            return false;
        }

        self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            note.title.to_lowercase().contains(&needle)
                || note.content.to_lowercase().contains(&needle)
        })
    }

    /// Filter a list, keeping its order
    pub fn apply<'a>(&self, notes: impl IntoIterator<Item = &'a Note>) -> Vec<Note> {
        notes
            .into_iter()
            .filter(|note| self.matches(note))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteChanges, NoteDraft};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn notes() -> Vec<Note> {
        let open = Note::provisional(
            NoteDraft::new("Vaccinate calves", "Batch B needs boosters", date(2024, 3, 10)),
            "u",
            None,
        );
        let mut done = Note::provisional(
            NoteDraft::new("Order feed", "Two tonnes of pellets", date(2024, 3, 20)),
            "u",
            None,
        );
        done.apply_changes(&NoteChanges::toggle(&done));
        vec![open, done]
    }

    #[test]
    fn default_filter_matches_everything() {
        assert_eq!(NoteFilter::default().apply(&notes()).len(), 2);
    }

    #[test]
    fn status_filter_splits_open_and_completed() {
        let notes = notes();
        let pending = NoteFilter::default()
            .with_status(CompletionFilter::Pending)
            .apply(&notes);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "Vaccinate calves");

        let completed = NoteFilter::default()
            .with_status(CompletionFilter::Completed)
            .apply(&notes);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "Order feed");
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_content() {
        let notes = notes();
        assert_eq!(NoteFilter::default().with_search("PELLETS").apply(&notes).len(), 1);
        assert_eq!(NoteFilter::default().with_search("calves").apply(&notes).len(), 1);
        assert_eq!(NoteFilter::default().with_search("   ").apply(&notes).len(), 2);
    }

    #[test]
    fn date_range_is_inclusive() {
        let notes = notes();
        let filter = NoteFilter::default().with_date_range(Some(date(2024, 3, 20)), None);
        assert_eq!(filter.apply(&notes).len(), 1);

        let filter =
            NoteFilter::default().with_date_range(Some(date(2024, 3, 10)), Some(date(2024, 3, 10)));
        assert_eq!(filter.apply(&notes)[0].title, "Vaccinate calves");
    }
}
