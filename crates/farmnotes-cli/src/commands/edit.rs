use chrono::NaiveDate;
use farmnotes_core::NoteChanges;

use crate::commands::common::{
    open_workspace, parse_editor_buffer, render_editor_buffer, resolve_note, CliContext,
};
use crate::commands::editor::edit_text;
use crate::error::CliError;

pub async fn run_edit(
    ctx: &CliContext,
    id: &str,
    title: Option<String>,
    content: Option<String>,
    date: Option<NaiveDate>,
) -> Result<(), CliError> {
    let workspace = open_workspace(ctx).await?;
    let note = resolve_note(&workspace.repo, id)?;

    let mut changes = NoteChanges::default();
    if title.is_none() && content.is_none() && date.is_none() {
        let Some(buffer) = edit_text(&render_editor_buffer(&note))? else {
            return Err(CliError::EmptyTitle);
        };
        let (title, body) = parse_editor_buffer(&buffer).ok_or(CliError::EmptyTitle)?;
        if title != note.title {
            changes = changes.title(title);
        }
        if body != note.content {
            changes = changes.content(body);
        }
    } else {
        if let Some(title) = title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(CliError::EmptyTitle);
            }
            changes = changes.title(title);
        }
        if let Some(content) = content {
            changes = changes.content(content.trim());
        }
        if let Some(date) = date {
            changes = changes.note_date(date);
        }
    }

    if changes.is_empty() {
        println!("{}", note.id);
        return Ok(());
    }

    let updated = workspace
        .repo
        .update(&note.id, changes)
        .await?
        .ok_or_else(|| CliError::NoteNotFound(id.to_string()))?;
    println!("{}", updated.id);
    Ok(())
}
