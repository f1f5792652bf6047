//! `fairdesk health`: the startup health summary.

use fairdesk_config::Settings;
use fairdesk_core::StartupHealth;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, paint_flag};

pub async fn handle(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let health = super::diagnostics(settings)?
        .run_startup_health_check()
        .await;
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &health,
        |h| detail(h, &settings.profile, color),
        summary,
    )?;
    output::print_output(&out, global.quiet);

    if !health.env.is_complete() {
        return Err(super::not_configured(settings));
    }
    if !health.connection {
        return Err(CliError::Unreachable {
            url: super::display_url(settings),
        });
    }
    Ok(())
}

fn detail(health: &StartupHealth, profile: &str, color: bool) -> String {
    output::render_pairs(&[
        ("Profile", profile.to_owned()),
        ("Service URL", paint_flag(health.env.url_present, color)),
        ("API key", paint_flag(health.env.key_present, color)),
        ("Connection", paint_flag(health.connection, color)),
        ("Session", paint_flag(health.auth, color)),
        ("Row policies", paint_flag(health.rls, color)),
        ("Latency", format!("{} ms", health.latency_ms)),
        ("Checked at", health.timestamp.to_rfc3339()),
    ])
}

/// `key=value` pairs for scripts.
fn summary(health: &StartupHealth) -> String {
    format!(
        "env={} connection={} auth={} rls={} latency_ms={}",
        health.env.is_complete(),
        health.connection,
        health.auth,
        health.rls,
        health.latency_ms
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fairdesk_core::EnvPresence;

    use super::*;

    #[test]
    fn summary_is_one_line() {
        let health = StartupHealth {
            env: EnvPresence {
                url_present: true,
                key_present: true,
            },
            connection: true,
            auth: false,
            rls: false,
            latency_ms: 42,
            timestamp: Utc::now(),
        };
        assert_eq!(
            summary(&health),
            "env=true connection=true auth=false rls=false latency_ms=42"
        );
    }
}
