//! CLI Supabase auth helpers. Sessions live in the profile's local cache file.

use std::sync::Arc;

use farmnotes_core::auth::{AuthSession, KvSessionStore, SupabaseAuthClient};
use farmnotes_core::cache::KeyValueStorage;
use farmnotes_core::config::ClientConfig;

use crate::error::CliError;

pub type CliAuthClient = SupabaseAuthClient<KvSessionStore>;

/// Build an auth client for `config`, or `None` when the backend is not
/// configured
pub fn auth_client(
    config: &ClientConfig,
    storage: Arc<dyn KeyValueStorage>,
) -> Result<Option<CliAuthClient>, CliError> {
    let Some((url, anon_key)) = config.remote() else {
        return Ok(None);
    };
    SupabaseAuthClient::new(
        url,
        anon_key,
        config.request_timeout(),
        KvSessionStore::new(storage),
    )
    .map(Some)
    .map_err(|error| CliError::Auth(error.to_string()))
}

/// Session to attach to remote requests.
///
/// Online, an expired session is refreshed first; offline the stored copy is
/// used as-is so queued work keeps its author.
pub async fn session_for_run(
    client: &CliAuthClient,
    online: bool,
) -> Result<Option<AuthSession>, CliError> {
    let session = if online {
        client.restore_session().await
    } else {
        client.stored_session()
    };
    session.map_err(|error| CliError::Auth(error.to_string()))
}

pub fn describe_session(session: &AuthSession) -> String {
    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
    let expiry = chrono::DateTime::from_timestamp(session.expires_at, 0).map_or_else(
        || session.expires_at.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    if session.is_expired() {
        format!("{email_label} (session expired {expiry})")
    } else {
        format!("{email_label} (expires {expiry})")
    }
}
