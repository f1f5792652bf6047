//! `fairdesk net`: host presence, configuration, reachability.

use fairdesk_config::Settings;
use fairdesk_core::{NetworkCheck, NetworkPresence};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, paint_flag};
use crate::presence;

pub async fn handle(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let presence = NetworkPresence::online();
    if let Some(ref url) = settings.service.url {
        presence::refresh(&presence, url, settings.diagnostics.probe_timeout).await;
    }

    let check = super::diagnostics(settings)?
        .with_presence(presence)
        .run_minimal_network_check()
        .await;
    let color = output::should_color(&global.color);

    let out = output::render_single(&global.output, &check, |c| detail(c, color), summary)?;
    output::print_output(&out, global.quiet);

    if !check.config_ok {
        return Err(super::not_configured(settings));
    }
    if !check.reachable {
        return Err(CliError::Unreachable {
            url: super::display_url(settings),
        });
    }
    Ok(())
}

fn detail(check: &NetworkCheck, color: bool) -> String {
    output::render_pairs(&[
        ("Online", paint_flag(check.online, color)),
        ("Configured", paint_flag(check.config_ok, color)),
        ("Reachable", paint_flag(check.reachable, color)),
        (
            "Latency",
            check
                .latency_ms
                .map_or_else(|| "-".into(), |ms| format!("{ms} ms")),
        ),
    ])
}

fn summary(check: &NetworkCheck) -> String {
    if check.reachable {
        "reachable".into()
    } else if !check.online {
        "offline".into()
    } else {
        "unreachable".into()
    }
}
