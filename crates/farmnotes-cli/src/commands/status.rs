use serde::Serialize;

use crate::auth::describe_session;
use crate::commands::common::{open_workspace, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub profile: String,
    pub cache_path: String,
    pub backend: Option<String>,
    pub connectivity: String,
    pub signed_in_as: Option<String>,
    pub sync_state: String,
    pub queued_operations: usize,
    pub cached_notes: usize,
}

impl StatusReport {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Profile:       {}", self.profile),
            format!("Cache:         {}", self.cache_path),
            format!(
                "Backend:       {}",
                self.backend.as_deref().unwrap_or("(not configured)")
            ),
            format!("Connectivity:  {}", self.connectivity),
            format!(
                "Signed in:     {}",
                self.signed_in_as.as_deref().unwrap_or("no")
            ),
            format!(
                "Sync:          {} ({} queued)",
                self.sync_state, self.queued_operations
            ),
            format!("Cached notes:  {}", self.cached_notes),
        ]
    }
}

pub async fn run_status(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let workspace = open_workspace(ctx).await?;
    let repo = &workspace.repo;

    let report = StatusReport {
        profile: ctx.profile_name.clone(),
        cache_path: ctx.cache_path.display().to_string(),
        backend: ctx.config.supabase_url.clone(),
        connectivity: repo.monitor().status().to_string(),
        signed_in_as: workspace.session.as_ref().map(describe_session),
        sync_state: repo.sync_state().to_string(),
        queued_operations: repo.pending_operations(),
        cached_notes: repo.cached().len(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    Ok(())
}
