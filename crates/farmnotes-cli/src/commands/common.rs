use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use farmnotes_core::auth::AuthSession;
use farmnotes_core::cache::{KeyValueStorage, LocalCacheStore, SqliteStorage};
use farmnotes_core::config::ClientConfig;
use farmnotes_core::connectivity::{
    ConnectivityMonitor, ConnectivityStatus, FixedProbe, HttpProbe,
};
use farmnotes_core::remote::SupabaseRestClient;
use farmnotes_core::sync::SyncOutcome;
use farmnotes_core::{Note, NoteId, NotesRepository};
use serde::Serialize;

use crate::auth::{auth_client, session_for_run};
use crate::config_profiles::{resolve_client_config, CliProfilesConfig};
use crate::error::CliError;

pub const ENV_CACHE_PATH: &str = "FARMNOTES_CACHE_PATH";

pub type CliRepository = NotesRepository<SupabaseRestClient, SupabaseRestClient>;

/// Global options resolved once per invocation
#[derive(Debug, Clone)]
pub struct CliContext {
    pub profile_name: String,
    pub config: ClientConfig,
    pub cache_path: PathBuf,
    pub offline: bool,
}

impl CliContext {
    pub fn resolve(
        cache_path: Option<PathBuf>,
        profile: Option<&str>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(profile);
        let config = resolve_client_config(&profiles, &profile_name).map_err(CliError::Config)?;
        let cache_path = resolve_cache_path(cache_path, &profile_name)?;
        Ok(Self {
            profile_name,
            config,
            cache_path,
            offline,
        })
    }

    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStorage>, CliError> {
        Ok(Arc::new(SqliteStorage::open(&self.cache_path)?))
    }

    fn require_remote(&self) -> Result<(&str, &str), CliError> {
        self.config
            .remote()
            .ok_or_else(|| CliError::NotConfigured(self.profile_name.clone()))
    }
}

/// Everything a note command needs, wired for this run
pub struct Workspace {
    pub repo: CliRepository,
    pub session: Option<AuthSession>,
}

/// Open the local cache, probe connectivity and build the repository.
///
/// When the previous run ended offline and the probe now answers, the
/// transition is fed to the repository so queued work is replayed before the
/// command runs.
pub async fn open_workspace(ctx: &CliContext) -> Result<Workspace, CliError> {
    let (url, anon_key) = ctx.require_remote()?;
    let timeout = ctx.config.request_timeout();

    let storage = ctx.open_storage()?;
    let cache = Arc::new(LocalCacheStore::new(
        storage.clone(),
        ctx.config.cache_namespace.clone(),
    )?);
    let monitor = ConnectivityMonitor::restored(cache.clone());

    let event = if ctx.offline {
        monitor
            .refresh(&FixedProbe(ConnectivityStatus::Offline))
            .await
    } else {
        let probe = HttpProbe::new(health_url(url), timeout)?;
        monitor.refresh(&probe).await
    };

    let auth = auth_client(&ctx.config, storage)?
        .ok_or_else(|| CliError::NotConfigured(ctx.profile_name.clone()))?;
    let session = session_for_run(&auth, monitor.is_online()).await?;

    let remote = SupabaseRestClient::new(url, anon_key, timeout)?.with_session(session.clone());
    let repo = NotesRepository::new(remote.clone(), remote, cache, monitor)?;

    if let Some(event) = event {
        match repo.handle_connectivity_event(event).await {
            Ok(Some(outcome)) => tracing::info!("{}", describe_sync_outcome(outcome)),
            Ok(None) => {}
            Err(error) => tracing::warn!("Queued changes were not synced: {}", error),
        }
    }

    Ok(Workspace { repo, session })
}

fn health_url(supabase_url: &str) -> String {
    format!("{}/auth/v1/health", supabase_url.trim_end_matches('/'))
}

pub const fn describe_sync_outcome(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Synced => "Sync completed",
        SyncOutcome::AlreadyClean => "Nothing to sync",
        SyncOutcome::InFlight => "Sync already in progress",
    }
}

/// Find a note by full id or unique id prefix in the local list
pub fn resolve_note(repo: &CliRepository, note_query: &str) -> Result<Note, CliError> {
    let note_query = normalize_note_identifier(note_query)?;
    if let Some(note) = repo.get_by_id(&NoteId::from(note_query.as_str())) {
        return Ok(note);
    }
    pick_by_prefix(repo.cached(), &note_query)
}

pub fn pick_by_prefix(notes: Vec<Note>, note_query: &str) -> Result<Note, CliError> {
    let mut matching = notes
        .into_iter()
        .filter(|note| note.id.as_str().starts_with(note_query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::NoteNotFound(note_query.to_string())),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| short_id(&note.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub note_date: NaiveDate,
    pub is_completed: bool,
    pub completed_date: Option<NaiveDate>,
    pub updated_at: String,
    pub relative_time: String,
    pub unsynced: bool,
}

pub fn short_id(id: &NoteId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now = Utc::now();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id);
            let check = if note.is_completed { "[x]" } else { "[ ]" };
            let preview = note_preview(note, 40);
            let relative_time = format_relative_time(note.updated_at, now);

            if note.is_provisional() {
                format!(
                    "{short_id:<13}  {check} {}  {preview:<40}  {relative_time:<10}  (unsynced)",
                    note.note_date
                )
            } else {
                format!(
                    "{short_id:<13}  {check} {}  {preview:<40}  {relative_time}",
                    note.note_date
                )
            }
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now = Utc::now();
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        note_date: note.note_date,
        is_completed: note.is_completed,
        completed_date: note.completed_date,
        updated_at: note.updated_at.to_rfc3339(),
        relative_time: format_relative_time(note.updated_at, now),
        unsynced: note.is_provisional(),
    }
}

/// Title when present, otherwise the first line of the body
pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let source = if note.title.trim().is_empty() {
        note.content.lines().next().unwrap_or("")
    } else {
        note.title.as_str()
    };
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

const RELATIVE_UNITS: [(i64, &str); 6] = [
    (365 * 24 * 60, "y"),
    (30 * 24 * 60, "mo"),
    (7 * 24 * 60, "w"),
    (24 * 60, "d"),
    (60, "h"),
    (1, "m"),
];

pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = now.signed_duration_since(then).num_minutes();
    RELATIVE_UNITS
        .iter()
        .find(|(size, _)| minutes >= *size)
        .map_or_else(
            || "just now".to_string(),
            |(size, label)| format!("{}{label} ago", minutes / size),
        )
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    normalize_content(&parts.join(" ")).ok_or(CliError::EmptyTitle)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Editor buffer for a note: title on the first line, body after a blank line
pub fn render_editor_buffer(note: &Note) -> String {
    if note.content.is_empty() {
        format!("{}\n", note.title)
    } else {
        format!("{}\n\n{}\n", note.title, note.content)
    }
}

/// Split an edited buffer back into title and body
pub fn parse_editor_buffer(buffer: &str) -> Option<(String, String)> {
    let buffer = buffer.trim_start();
    let (title, body) = buffer.split_once('\n').unwrap_or((buffer, ""));
    let title = normalize_content(title)?;
    Some((title, body.trim().to_string()))
}

/// `--cache-path`, then `FARMNOTES_CACHE_PATH`, then one file per profile in
/// the user data directory
pub fn resolve_cache_path(
    cli_cache_path: Option<PathBuf>,
    profile_name: &str,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_cache_path.or_else(|| env::var_os(ENV_CACHE_PATH).map(PathBuf::from))
    {
        return Ok(path);
    }
    default_cache_path(profile_name)
}

pub fn default_cache_path(profile_name: &str) -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("farmnotes").join(format!("{profile_name}.db")))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}
