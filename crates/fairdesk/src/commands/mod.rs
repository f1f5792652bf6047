//! Command dispatch: bridges CLI args -> core diagnostics -> output formatting.

pub mod check;
pub mod config_cmd;
pub mod health;
pub mod net;
pub mod sweep;
pub mod watch;

use fairdesk_config::Settings;
use fairdesk_core::{Diagnostics, ServiceClient};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Check => check::handle(settings, global).await,
        Command::Health => health::handle(settings, global).await,
        Command::Sweep(args) => sweep::handle(settings, args, global).await,
        Command::Net => net::handle(settings, global).await,
        Command::Watch(args) => watch::handle(settings, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Diagnostics over the real HTTP client. Missing URL or key is not an
/// error here; the diagnostics report it.
pub(crate) fn diagnostics(settings: &Settings) -> Result<Diagnostics<ServiceClient>, CliError> {
    Ok(Diagnostics::from_service_config(
        &settings.service,
        settings.diagnostics.clone(),
    )?)
}

/// URL for messages, or a placeholder when unset.
pub(crate) fn display_url(settings: &Settings) -> String {
    settings
        .service
        .url
        .as_ref()
        .map_or_else(|| "(not configured)".into(), ToString::to_string)
}

/// Error for a profile whose URL or key is missing.
pub(crate) fn not_configured(settings: &Settings) -> CliError {
    CliError::NotConfigured {
        profile: settings.profile.clone(),
        missing: settings.service.presence().missing().join(" and "),
    }
}
