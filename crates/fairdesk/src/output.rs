//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one summary line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use fairdesk_core::{OverallStatus, ProbeStatus};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Sweep status word, colored when enabled.
pub fn paint_overall(status: OverallStatus, color: bool) -> String {
    let word = status.to_string();
    if !color {
        return word;
    }
    match status {
        OverallStatus::Success => word.green().bold().to_string(),
        OverallStatus::Warning => word.yellow().bold().to_string(),
        OverallStatus::Failure => word.red().bold().to_string(),
        OverallStatus::Pending => word.dimmed().to_string(),
    }
}

pub fn paint_probe(status: ProbeStatus, color: bool) -> String {
    let word = status.to_string();
    match (status, color) {
        (_, false) => word,
        (ProbeStatus::Ok, true) => word.green().to_string(),
        (ProbeStatus::Error, true) => word.red().to_string(),
    }
}

/// "yes"/"no" cell, green or red when enabled.
pub fn paint_flag(value: bool, color: bool) -> String {
    let word = if value { "yes" } else { "no" };
    match (value, color) {
        (_, false) => word.to_owned(),
        (true, true) => word.green().to_string(),
        (false, true) => word.red().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, which returns a pre-formatted string;
/// plain rendering uses `plain_fn` for a one-line summary.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Two-column key/value table for single-item detail views.
pub fn render_pairs(pairs: &[(&str, String)]) -> String {
    #[derive(Tabled)]
    struct Pair<'a> {
        #[tabled(rename = "Field")]
        field: &'a str,
        #[tabled(rename = "Value")]
        value: &'a str,
    }

    let rows: Vec<Pair<'_>> = pairs
        .iter()
        .map(|(field, value)| Pair {
            field,
            value: value.as_str(),
        })
        .collect();
    render_table(&rows)
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Serialization {
        format: "JSON",
        reason: e.to_string(),
    })
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Serialization {
        format: "YAML",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Sample {
        name: &'static str,
        up: bool,
    }

    const SAMPLE: Sample = Sample {
        name: "profiles",
        up: true,
    };

    #[test]
    fn json_compact_is_single_line() {
        let out = render_single(&OutputFormat::JsonCompact, &SAMPLE, |_| String::new(), |_| {
            String::new()
        })
        .unwrap_or_default();
        assert_eq!(out, r#"{"name":"profiles","up":true}"#);
    }

    #[test]
    fn plain_uses_summary_fn() {
        let out = render_single(
            &OutputFormat::Plain,
            &SAMPLE,
            |_| "table".into(),
            |s| format!("{} {}", s.name, s.up),
        )
        .unwrap_or_default();
        assert_eq!(out, "profiles true");
    }

    #[test]
    fn uncolored_words_are_bare() {
        assert_eq!(paint_overall(OverallStatus::Warning, false), "warning");
        assert_eq!(paint_probe(ProbeStatus::Error, false), "error");
        assert_eq!(paint_flag(true, false), "yes");
    }

    #[test]
    fn pairs_table_contains_values() {
        let table = render_pairs(&[("Status", "success".into()), ("Latency", "12 ms".into())]);
        assert!(table.contains("Status"));
        assert!(table.contains("12 ms"));
    }
}
