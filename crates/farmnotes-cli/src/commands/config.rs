use std::path::Path;

use farmnotes_core::config::ClientConfig;
use farmnotes_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::commands::common::resolve_cache_path;
use crate::config_profiles::{resolve_client_config, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    cache_path: Option<&Path>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            request_timeout_secs,
            no_activate,
        } => run_config_init(
            global_profile,
            supabase_url,
            supabase_anon_key,
            request_timeout_secs,
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile, cache_path),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    request_timeout_secs: Option<u64>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let env = ClientConfig::from_env().map_err(CliError::Config)?;

    let profile = config.profile_mut_or_default(&profile_name);
    apply_profile_updates(
        profile,
        normalize_text_option(supabase_url).or(env.supabase_url),
        normalize_text_option(supabase_anon_key).or(env.supabase_anon_key),
        request_timeout_secs,
    )?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `farmnotes auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Overlay explicit values onto a stored profile and validate the result
pub fn apply_profile_updates(
    profile: &mut CliProfile,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    request_timeout_secs: Option<u64>,
) -> Result<(), CliError> {
    if let Some(url) = supabase_url {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
        profile.supabase_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(key) = supabase_anon_key {
        profile.supabase_anon_key = Some(key);
    }
    if let Some(timeout) = request_timeout_secs {
        if timeout == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        profile.request_timeout_secs = Some(timeout);
    }
    Ok(())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}

pub fn run_config_show(
    profile_name: Option<&str>,
    cache_path: Option<&Path>,
) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let resolved = resolve_client_config(&config, &profile_name).map_err(CliError::Config)?;
    let cache_path = resolve_cache_path(cache_path.map(Path::to_path_buf), &profile_name)?;

    let stored = if config.profile(&profile_name).is_some() {
        "stored"
    } else {
        "not stored, environment only"
    };
    println!("Profile:          {profile_name} ({stored})");
    println!(
        "Supabase URL:     {}",
        resolved.supabase_url.as_deref().unwrap_or("(unset)")
    );
    println!(
        "Anon key:         {}",
        if resolved.supabase_anon_key.is_some() {
            "(set)"
        } else {
            "(unset)"
        }
    );
    println!("Request timeout:  {}s", resolved.request_timeout_secs);
    println!("Cache namespace:  {}", resolved.cache_namespace);
    println!("Cache file:       {}", cache_path.display());
    Ok(())
}
