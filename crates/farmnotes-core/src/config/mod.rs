//! Client configuration.
//!
//! `ClientConfig` carries the public Supabase endpoint and anon key plus the
//! local cache settings shared by every front end. Secret credentials never
//! live here; the signed-in session is persisted separately.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CACHE_NAMESPACE: &str = "farmnotes";

pub const ENV_SUPABASE_URL: &str = "FARMNOTES_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "FARMNOTES_SUPABASE_ANON_KEY";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "FARMNOTES_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build a config from `FARMNOTES_*` environment variables.
    ///
    /// Unset variables keep their defaults; a malformed timeout is an error.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self {
            supabase_url: lookup(ENV_SUPABASE_URL),
            supabase_anon_key: lookup(ENV_SUPABASE_ANON_KEY),
            ..Self::default()
        };
        if let Some(raw) = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            config.request_timeout_secs = raw.parse().map_err(|_| {
                format!("{ENV_REQUEST_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}'")
            })?;
        }
        config.normalize()
    }

    /// Overlay values from `other` that are set
    #[must_use]
    pub fn merged_with(mut self, other: &Self) -> Self {
        if other.supabase_url.is_some() {
            self.supabase_url.clone_from(&other.supabase_url);
        }
        if other.supabase_anon_key.is_some() {
            self.supabase_anon_key.clone_from(&other.supabase_anon_key);
        }
        if other.request_timeout_secs != DEFAULT_REQUEST_TIMEOUT_SECS {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.cache_namespace != DEFAULT_CACHE_NAMESPACE {
            self.cache_namespace.clone_from(&other.cache_namespace);
        }
        self
    }

    /// Trim values and validate the ones that are present
    pub fn normalize(self) -> Result<Self, String> {
        let supabase_url = match normalize_text_option(self.supabase_url) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => return Err("supabase_url must include http:// or https://".to_string()),
            None => None,
        };
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than zero".to_string());
        }
        let cache_namespace = self.cache_namespace.trim().to_string();
        if cache_namespace.is_empty() || cache_namespace.contains(':') {
            return Err("cache_namespace must be non-empty and must not contain ':'".to_string());
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key: normalize_text_option(self.supabase_anon_key),
            request_timeout_secs: self.request_timeout_secs,
            cache_namespace,
        })
    }

    /// Both remote settings, when the config can reach the backend
    pub fn remote(&self) -> Option<(&str, &str)> {
        Some((
            self.supabase_url.as_deref()?,
            self.supabase_anon_key.as_deref()?,
        ))
    }

    /// Like [`remote`](Self::remote) but an error naming what is missing
    pub fn require_remote(&self) -> Result<(&str, &str), String> {
        match (self.supabase_url.as_deref(), self.supabase_anon_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            (None, Some(_)) => Err("supabase_url is not configured".to_string()),
            (Some(_), None) => Err("supabase_anon_key is not configured".to_string()),
            (None, None) => Err("Supabase URL and anon key are not configured".to_string()),
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_cache_namespace() -> String {
    DEFAULT_CACHE_NAMESPACE.to_string()
}
