//! `fairdesk sweep`: probe each resource and print the aggregate report.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use fairdesk_config::Settings;
use fairdesk_core::{DiagnosticReport, OverallStatus, ProbeResult};

use crate::cli::{GlobalOpts, OutputFormat, SweepArgs};
use crate::error::CliError;
use crate::output::{self, paint_overall, paint_probe};

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Rows")]
    count: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl ResourceRow {
    fn new(resource: &str, result: &ProbeResult, color: bool) -> Self {
        Self {
            resource: resource.to_owned(),
            status: paint_probe(result.status, color),
            count: result.count.map_or_else(|| "-".into(), |n| n.to_string()),
            latency: format!("{} ms", result.latency_ms),
            detail: result.detail.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(
    settings: &Settings,
    args: SweepArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let diagnostics = super::diagnostics(settings)?;
    let SweepArgs { resources } = args;

    let spinner = spinner(global);
    let report = if resources.is_empty() {
        diagnostics.run_default_sweep().await
    } else {
        diagnostics.run_resource_sweep(resources.as_slice()).await
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| r.overall_status.to_string(),
    )?;
    output::print_output(&out, global.quiet);

    // Warnings still exit zero: the service itself was reached.
    if report.overall_status == OverallStatus::Failure {
        return Err(CliError::SweepFailed {
            status: report.overall_status,
        });
    }
    Ok(())
}

/// Spinner on stderr for interactive table output only.
fn spinner(global: &GlobalOpts) -> Option<ProgressBar> {
    let interactive = matches!(global.output, OutputFormat::Table)
        && !global.quiet
        && std::io::stderr().is_terminal();
    if !interactive {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Probing resources...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

fn detail(report: &DiagnosticReport, color: bool) -> String {
    let mut lines = vec![format!(
        "Overall: {}  (canary latency {} ms)",
        paint_overall(report.overall_status, color),
        report.latency_ms
    )];
    if let Some(ref fatal) = report.fatal_error {
        lines.push(format!("Error: {fatal}"));
    }
    if !report.resources.is_empty() {
        let rows: Vec<ResourceRow> = report
            .resources
            .iter()
            .map(|(name, result)| ResourceRow::new(name, result, color))
            .collect();
        lines.push(output::render_table(&rows));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fairdesk_core::ProbeStatus;

    use super::*;

    #[test]
    fn fatal_report_has_no_table() {
        let report = DiagnosticReport::fatal(Utc::now(), "no resources to probe");
        let text = detail(&report, false);
        assert!(text.starts_with("Overall: failure"));
        assert!(text.contains("Error: no resources to probe"));
        assert!(!text.contains("Resource"));
    }

    #[test]
    fn rows_show_missing_counts_as_dash() {
        let result = ProbeResult {
            status: ProbeStatus::Error,
            detail: Some("permission denied".into()),
            count: None,
            latency_ms: 7,
        };
        let row = ResourceRow::new("customers", &result, false);
        assert_eq!(row.status, "error");
        assert_eq!(row.count, "-");
        assert_eq!(row.latency, "7 ms");
    }
}
