//! `fairdesk check`: one canary probe.

use owo_colors::OwoColorize;

use fairdesk_config::Settings;
use fairdesk_core::QuickCheck;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let check = super::diagnostics(settings)?.run_quick_check().await;
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &check,
        |c| detail(c, color),
        |c| c.message.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if check.success {
        Ok(())
    } else {
        Err(CliError::CheckFailed {
            message: check.message,
        })
    }
}

fn detail(check: &QuickCheck, color: bool) -> String {
    let mark = match (check.success, color) {
        (true, true) => "✓".green().to_string(),
        (false, true) => "✗".red().to_string(),
        (true, false) => "✓".into(),
        (false, false) => "✗".into(),
    };
    match &check.error {
        Some(error) => format!("{mark} {} ({error})", check.message),
        None => format!("{mark} {}", check.message),
    }
}

#[cfg(test)]
mod tests {
    use fairdesk_core::FailureKind;

    use super::*;

    #[test]
    fn detail_includes_the_error() {
        let check = QuickCheck {
            success: false,
            message: "Could not connect to the data service".into(),
            error: Some("Service Unavailable".into()),
            kind: Some(FailureKind::Transport),
        };
        assert_eq!(
            detail(&check, false),
            "✗ Could not connect to the data service (Service Unavailable)"
        );
    }
}
