//! PostgREST adapter for the `notes` and `profiles` tables

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{RemoteError, RemoteNoteStore, RemoteResult};
use crate::auth::{parse_api_error, Actor, ActorProvider, AuthSession};
use crate::models::{NewNoteRow, NoteChangesRow, NoteId, NoteRow};
use crate::util::service_endpoint;

const NOTES_TABLE: &str = "notes";
const PROFILES_TABLE: &str = "profiles";
const NOTES_ORDER: &str = "note_date.desc,created_at.desc";

/// REST client for a Supabase project.
///
/// Requests carry the anon key as `apikey` and the signed-in user's access
/// token as bearer, so row-level policies scope every query. Clones share
/// the session.
#[derive(Clone)]
pub struct SupabaseRestClient {
    rest_url: String,
    anon_key: String,
    client: Client,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl SupabaseRestClient {
    pub fn new(url: &str, anon_key: &str, timeout: Duration) -> RemoteResult<Self> {
        let rest_url = normalize_rest_url(url)?;
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(RemoteError::NotConfigured(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key: anon_key.to_string(),
            client: Client::builder().timeout(timeout).build()?,
            session: Arc::new(RwLock::new(None)),
        })
    }

    #[must_use]
    pub fn with_session(self, session: Option<AuthSession>) -> Self {
        self.set_session(session);
        self
    }

    pub fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .session()
            .map_or_else(|| self.anon_key.clone(), |session| session.access_token);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
    }

    async fn send_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<Vec<T>> {
        let response = self.authorized(request).send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| RemoteError::InvalidPayload(error.to_string()))
    }
}

impl RemoteNoteStore for SupabaseRestClient {
    async fn fetch_notes(&self) -> RemoteResult<Vec<NoteRow>> {
        let request = self
            .client
            .get(self.table_url(NOTES_TABLE))
            .query(&[("select", "*"), ("order", NOTES_ORDER)]);
        let rows = self.send_rows(request).await?;
        tracing::debug!("Fetched {} notes", rows.len());
        Ok(rows)
    }

    async fn insert_note(&self, row: &NewNoteRow) -> RemoteResult<NoteRow> {
        let request = self
            .client
            .post(self.table_url(NOTES_TABLE))
            .header("Prefer", "return=representation")
            .json(row);
        let rows = self.send_rows(request).await?;
        rows.into_iter().next().ok_or_else(|| {
            RemoteError::InvalidPayload("insert returned no representation".to_string())
        })
    }

    async fn update_note(&self, id: &NoteId, changes: &NoteChangesRow) -> RemoteResult<NoteRow> {
        let request = self
            .client
            .patch(format!("{}?{}", self.table_url(NOTES_TABLE), id_filter(id.as_str())))
            .header("Prefer", "return=representation")
            .json(changes);
        let rows: Vec<NoteRow> = self.send_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn delete_note(&self, id: &NoteId) -> RemoteResult<()> {
        let request = self
            .client
            .delete(format!("{}?{}", self.table_url(NOTES_TABLE), id_filter(id.as_str())))
            .header("Prefer", "return=representation");
        let rows: Vec<serde_json::Value> = self.send_rows(request).await?;
        if rows.is_empty() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl ActorProvider for SupabaseRestClient {
    fn current_actor(&self) -> Option<Actor> {
        self.session().map(|session| session.actor())
    }

    async fn institution_id(&self, actor: &Actor) -> RemoteResult<Option<String>> {
        let request = self
            .client
            .get(format!(
                "{}?{}",
                self.table_url(PROFILES_TABLE),
                id_filter(&actor.user_id)
            ))
            .query(&[("select", "institution_id")]);
        let rows: Vec<ProfileRow> = self.send_rows(request).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|profile| profile.institution_id)
            .filter(|id| !id.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    institution_id: Option<String>,
}

async fn check_status(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

fn id_filter(id: &str) -> String {
    format!("id=eq.{}", urlencoding::encode(id))
}

fn normalize_rest_url(url: &str) -> RemoteResult<String> {
    service_endpoint(url, "/rest/v1")
        .map_err(|message| RemoteError::NotConfigured(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    fn client() -> SupabaseRestClient {
        SupabaseRestClient::new("https://farm.supabase.co/", "anon", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn rest_url_is_derived_from_project_url() {
        assert_eq!(
            normalize_rest_url("https://farm.supabase.co/").unwrap(),
            "https://farm.supabase.co/rest/v1"
        );
        assert_eq!(
            normalize_rest_url("https://farm.supabase.co/rest/v1").unwrap(),
            "https://farm.supabase.co/rest/v1"
        );
        assert!(normalize_rest_url("farm.supabase.co").is_err());
    }

    #[test]
    fn empty_anon_key_is_rejected() {
        let result = SupabaseRestClient::new("https://farm.supabase.co", " ", Duration::from_secs(1));
        assert!(matches!(result, Err(RemoteError::NotConfigured(_))));
    }

    #[test]
    fn id_filter_escapes_reserved_characters() {
        assert_eq!(id_filter("abc-123"), "id=eq.abc-123");
        assert_eq!(id_filter("a&b=c"), "id=eq.a%26b%3Dc");
    }

    #[test]
    fn actor_comes_from_shared_session() {
        let client = client();
        let clone = client.clone();
        assert!(clone.current_actor().is_none());

        client.set_session(Some(AuthSession {
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "user-7".to_string(),
                email: None,
            },
        }));
        assert_eq!(clone.current_actor(), Some(Actor::new("user-7")));

        client.set_session(None);
        assert!(clone.current_actor().is_none());
    }

    #[test]
    fn profile_row_tolerates_missing_institution() {
        let rows: Vec<ProfileRow> =
            serde_json::from_str(r#"[{"institution_id":null},{}]"#).unwrap();
        assert!(rows.iter().all(|row| row.institution_id.is_none()));
    }
}
