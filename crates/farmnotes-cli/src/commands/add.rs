use chrono::NaiveDate;
use farmnotes_core::util::today;
use farmnotes_core::NoteDraft;

use crate::commands::common::{
    normalize_content, normalize_title, open_workspace, read_piped_stdin, short_id, CliContext,
};
use crate::error::CliError;

pub async fn run_add(
    ctx: &CliContext,
    title_parts: &[String],
    content: Option<String>,
    date: Option<NaiveDate>,
    completed: bool,
) -> Result<(), CliError> {
    let title = normalize_title(title_parts)?;
    let content = match content.as_deref().and_then(normalize_content) {
        Some(content) => content,
        None => read_piped_stdin()?.unwrap_or_default(),
    };
    let date = date.unwrap_or_else(today);
    let mut draft = NoteDraft::new(title, content, date);
    if completed {
        draft = draft.completed(Some(today()));
    }

    let workspace = open_workspace(ctx).await?;
    let note = workspace.repo.add(draft).await?;

    if note.is_provisional() {
        println!("{} (queued, will sync when back online)", short_id(&note.id));
    } else {
        println!("{}", note.id);
    }
    Ok(())
}
