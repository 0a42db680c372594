use crate::commands::common::{open_workspace, resolve_note, CliContext};
use crate::error::CliError;

pub async fn run_delete(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let workspace = open_workspace(ctx).await?;
    let note = resolve_note(&workspace.repo, id)?;

    workspace.repo.delete(&note.id).await?;
    println!("{}", note.id);
    Ok(())
}
