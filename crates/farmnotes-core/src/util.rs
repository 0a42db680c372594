//! Small helpers shared by config, auth and the remote adapters.

use chrono::NaiveDate;

/// Longest slice of a response body quoted back in error messages
const MAX_ERROR_TEXT: usize = 180;

/// Trimmed text, or `None` when absent or blank
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Endpoint for one Supabase service (`/auth/v1`, `/rest/v1`) under a
/// project URL. A URL that already points at the service is kept as-is.
pub fn service_endpoint(project_url: &str, service_path: &str) -> Result<String, &'static str> {
    let base = project_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err("Supabase URL must not be empty");
    }
    if !is_http_url(base) {
        return Err("Supabase URL must include http:// or https://");
    }
    if base.ends_with(service_path) {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}{service_path}"))
    }
}

/// Error bodies can be whole HTML pages; keep the head of it
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(MAX_ERROR_TEXT).collect()
}

/// Local calendar date used to stamp completions
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
