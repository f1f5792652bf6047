//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text, and each error into a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use fairdesk_config::ConfigError;
use fairdesk_core::{CoreError, OverallStatus};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Diagnostics outcomes ─────────────────────────────────────────
    #[error("Quick check failed: {message}")]
    #[diagnostic(
        code(fairdesk::check_failed),
        help(
            "Run `fairdesk health` for a breakdown, or `fairdesk sweep` to \
             probe every resource."
        )
    )]
    CheckFailed { message: String },

    #[error("Data service at {url} is unreachable")]
    #[diagnostic(
        code(fairdesk::unreachable),
        help(
            "Check that the service is up and the URL is right.\n\
             Try: fairdesk net -v"
        )
    )]
    Unreachable { url: String },

    #[error("Resource sweep ended with status {status}")]
    #[diagnostic(
        code(fairdesk::sweep_failed),
        help("The canary resource or every resource failed. See the report above.")
    )]
    SweepFailed { status: OverallStatus },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the data service at {url}")]
    #[diagnostic(
        code(fairdesk::connection_failed),
        help("Check that the service is running and accessible.\nURL: {url}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fairdesk::auth_failed),
        help(
            "Verify the API key for this profile.\n\
             Run: fairdesk config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("Data service is not configured for profile '{profile}': missing {missing}")]
    #[diagnostic(
        code(fairdesk::not_configured),
        help(
            "Configure the profile with: fairdesk config init\n\
             Or pass --url and --api-key (FAIRDESK_URL, FAIRDESK_API_KEY)."
        )
    )]
    NotConfigured { profile: String, missing: String },

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(fairdesk::timeout),
        help("Increase the probe timeout with --timeout or check service responsiveness.")
    )]
    Timeout { timeout_ms: u64 },

    #[error("API error: {message}")]
    #[diagnostic(code(fairdesk::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fairdesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fairdesk::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: fairdesk config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(fairdesk::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render {format}: {reason}")]
    #[diagnostic(code(fairdesk::serialization))]
    Serialization { format: &'static str, reason: String },

    #[error("Interactive prompt failed: {0}")]
    #[diagnostic(
        code(fairdesk::prompt),
        help("Run in an interactive terminal, or edit the config file directly.")
    )]
    Prompt(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CheckFailed { .. } | Self::Unreachable { .. } | Self::ConnectionFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NotConfigured { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(see: fairdesk config profiles)".into(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            CoreError::NotConfigured { missing } => Self::NotConfigured {
                profile: "current".into(),
                missing,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Api { message, .. } => Self::ApiError { message },
            CoreError::Internal(message) => Self::ApiError {
                message: format!("internal: {message}"),
            },
        }
    }
}
