use crate::commands::common::{open_workspace, resolve_note, CliContext};
use crate::error::CliError;

pub async fn run_toggle(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let workspace = open_workspace(ctx).await?;
    let note = resolve_note(&workspace.repo, id)?;

    let toggled = workspace
        .repo
        .toggle_complete(&note.id)
        .await?
        .ok_or_else(|| CliError::NoteNotFound(id.to_string()))?;

    match toggled.completed_date {
        Some(date) if toggled.is_completed => println!("{} completed on {date}", toggled.id),
        _ => println!("{} reopened", toggled.id),
    }
    Ok(())
}
