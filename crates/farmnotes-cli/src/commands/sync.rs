use farmnotes_core::sync::SyncOutcome;

use crate::commands::common::{describe_sync_outcome, open_workspace, CliContext};
use crate::error::CliError;

pub async fn run_sync(ctx: &CliContext) -> Result<(), CliError> {
    let workspace = open_workspace(ctx).await?;
    let queued = workspace.repo.pending_operations();

    let outcome = workspace.repo.sync_data().await?;
    match outcome {
        SyncOutcome::Synced if queued > 0 => {
            println!("{} ({queued} queued changes pushed)", describe_sync_outcome(outcome));
        }
        _ => println!("{}", describe_sync_outcome(outcome)),
    }
    Ok(())
}
