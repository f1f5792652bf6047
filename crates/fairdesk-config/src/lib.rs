//! Shared configuration for fairdesk tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to the `fairdesk_core` runtime settings. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fairdesk_core::config::{
    DEFAULT_CANARY, DEFAULT_MONITOR_INTERVAL, DEFAULT_POLICY_RESOURCE, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_SWEEP_RESOURCES,
};
use fairdesk_core::{DiagnosticsConfig, MonitorConfig, ServiceConfig, TlsVerification};

/// Keyring service name for stored credentials.
pub const KEYRING_SERVICE: &str = "fairdesk";

/// Env var consulted for the signed-in user's access token.
pub const ACCESS_TOKEN_ENV: &str = "FAIRDESK_ACCESS_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named data-service profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: the explicit one, else the configured
    /// default, else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up an explicitly requested profile; unknown names are an error.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Monitor period for `watch`, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout_ms: default_timeout_ms(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_PROBE_TIMEOUT.as_millis()).unwrap_or(5000)
}
fn default_interval_secs() -> u64 {
    DEFAULT_MONITOR_INTERVAL.as_secs()
}

/// A named data-service profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "https://project.example.co").
    pub url: Option<String>,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Environment variable name containing a user access token.
    pub access_token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification (self-hosted development stacks only).
    pub insecure: Option<bool>,

    /// Override probe timeout.
    pub timeout_ms: Option<u64>,

    /// Resource that decides reachability.
    pub canary: Option<String>,

    /// Resource read with the session to check row-level policies.
    pub policy_resource: Option<String>,

    /// Default sweep list. The first entry is the sweep's canary.
    pub resources: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fairdesk", "fairdesk").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fairdesk");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` merged with `FAIRDESK_*` env vars. A missing file
/// yields the defaults; nested keys use `__` (`FAIRDESK_DEFAULTS__TIMEOUT_MS`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FAIRDESK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_lookup(key: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, key)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

/// Env var → keyring → plaintext, with the keyring step injectable.
fn resolve_secret(
    env_name: Option<&str>,
    keyring_key: &str,
    plaintext: Option<&str>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    // 1. Env var
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            if !val.is_empty() {
                return Some(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Some(secret) = lookup(keyring_key) {
        return Some(SecretString::from(secret));
    }

    // 3. Plaintext in config
    plaintext.map(|value| SecretString::from(value.to_owned()))
}

/// Resolve the API key from the credential chain (no CLI flag step).
///
/// `None` is a reportable state, not an error: diagnostics say which
/// setting is missing.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_api_key_with(profile, profile_name, &keyring_lookup)
}

fn resolve_api_key_with(
    profile: &Profile,
    profile_name: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    resolve_secret(
        profile.api_key_env.as_deref(),
        &format!("{profile_name}/api-key"),
        profile.api_key.as_deref(),
        lookup,
    )
}

/// Resolve the signed-in user's access token: env var, then keyring.
pub fn resolve_access_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_access_token_with(profile, profile_name, &keyring_lookup)
}

fn resolve_access_token_with(
    profile: &Profile,
    profile_name: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    let env_name = profile
        .access_token_env
        .as_deref()
        .unwrap_or(ACCESS_TOKEN_ENV);
    resolve_secret(
        Some(env_name),
        &format!("{profile_name}/access-token"),
        None,
        lookup,
    )
}

/// Store the API key for `profile_name` in the system keyring.
pub fn store_api_key(profile_name: &str, api_key: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .and_then(|entry| entry.set_password(api_key))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation to runtime settings ─────────────────────────────────

/// Everything the core needs for one profile.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: String,
    pub service: ServiceConfig,
    pub monitor: MonitorConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Build runtime settings from a profile, without CLI flag overrides.
///
/// A missing URL or key stays `None` so diagnostics can report it; a URL
/// that is present but malformed is an error.
pub fn profile_to_settings(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<Settings, ConfigError> {
    settings_with(
        profile,
        profile_name,
        defaults,
        resolve_api_key(profile, profile_name),
        resolve_access_token(profile, profile_name),
    )
}

fn settings_with(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    api_key: Option<SecretString>,
    access_token: Option<SecretString>,
) -> Result<Settings, ConfigError> {
    let url = profile
        .url
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.parse::<url::Url>().map_err(|e| ConfigError::Validation {
                field: "url".into(),
                reason: format!("{raw}: {e}"),
            })
        })
        .transpose()?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout_ms = profile.timeout_ms.unwrap_or(defaults.timeout_ms);
    if timeout_ms == 0 {
        return Err(ConfigError::Validation {
            field: "timeout_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    let probe_timeout = Duration::from_millis(timeout_ms);

    let canary = profile
        .canary
        .clone()
        .unwrap_or_else(|| DEFAULT_CANARY.into());
    let resources = profile.resources.clone().unwrap_or_else(|| {
        DEFAULT_SWEEP_RESOURCES
            .iter()
            .map(ToString::to_string)
            .collect()
    });

    Ok(Settings {
        profile: profile_name.into(),
        service: ServiceConfig {
            url,
            api_key,
            access_token,
            tls,
            request_timeout: probe_timeout.max(Duration::from_secs(30)),
        },
        monitor: MonitorConfig {
            canary: canary.clone(),
            probe_timeout,
            interval: Duration::from_secs(defaults.interval_secs.max(1)),
        },
        diagnostics: DiagnosticsConfig {
            canary,
            policy_resource: profile
                .policy_resource
                .clone()
                .unwrap_or_else(|| DEFAULT_POLICY_RESOURCE.into()),
            resources,
            probe_timeout,
        },
    })
}
