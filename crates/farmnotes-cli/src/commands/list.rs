use chrono::NaiveDate;
use farmnotes_core::NoteFilter;

use crate::cli::StatusFilter;
use crate::commands::common::{
    format_note_lines, note_to_list_item, open_workspace, CliContext, NoteListItem,
};
use crate::error::CliError;

pub struct ListOptions {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: usize,
    pub as_json: bool,
}

impl ListOptions {
    pub fn filter(&self) -> NoteFilter {
        let filter = NoteFilter::default()
            .with_status(self.status.into())
            .with_date_range(self.from, self.to);
        match self.search.as_deref() {
            Some(search) => filter.with_search(search),
            None => filter,
        }
    }
}

pub async fn run_list(ctx: &CliContext, options: &ListOptions) -> Result<(), CliError> {
    let workspace = open_workspace(ctx).await?;
    let notes = workspace.repo.list().await?;
    let mut notes = options.filter().apply(&notes);
    notes.truncate(options.limit);

    if options.as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes.");
    }
    for line in format_note_lines(&notes) {
        println!("{line}");
    }
    if !workspace.repo.is_online() {
        println!("(offline: showing cached notes)");
    }
    Ok(())
}
