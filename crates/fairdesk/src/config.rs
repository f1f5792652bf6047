//! CLI configuration: thin wrapper around `fairdesk_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --api-key, --insecure, --timeout).

use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use fairdesk_config::{
    Config, Profile, Settings, config_path, load_config, profile_to_settings, save_config,
    store_api_key,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated, sorted profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// The active profile with flag overrides applied.
///
/// An explicitly requested profile must exist. Without one, a missing
/// default profile is an empty profile that flags and env vars can fill.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(config),
                name,
            });
        }
        None => Profile::default(),
    };

    if let Some(ref url) = global.url {
        profile.url = Some(url.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout_ms) = global.timeout {
        profile.timeout_ms = Some(timeout_ms);
    }
    Ok((name, profile))
}

/// Load the config file and build runtime settings for the active profile.
///
/// Key precedence: `--api-key` flag, then the profile's credential chain.
pub fn resolve_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    let config = load_config()?;
    let (name, profile) = resolve_profile(global, &config)?;
    let mut settings = profile_to_settings(&profile, &name, &config.defaults)?;

    if let Some(key) = global.api_key.as_deref().filter(|key| !key.is_empty()) {
        settings.service.api_key = Some(SecretString::from(key.to_owned()));
    }
    Ok(settings)
}
