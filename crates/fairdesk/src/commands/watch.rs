//! `fairdesk watch`: run the connection monitor until Ctrl-C.
//!
//! Table output prints one line per transition; JSON output prints one
//! compact object per line.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use fairdesk_config::Settings;
use fairdesk_core::{ConnectionMonitor, NetworkPresence};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;
use crate::presence;

#[derive(Debug, Clone, Copy, Serialize)]
struct Transition {
    timestamp: DateTime<Utc>,
    connected: bool,
}

pub async fn handle(
    settings: &Settings,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !settings.service.presence().is_complete() {
        return Err(super::not_configured(settings));
    }
    let client = settings.service.require_client()?;
    let url = client.base_url().clone();

    let period = match args.interval {
        Some(0) => {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Some(secs) => Duration::from_secs(secs),
        None => settings.monitor.interval,
    };

    let presence = NetworkPresence::online();
    presence::refresh(&presence, &url, settings.monitor.probe_timeout).await;
    let monitor = ConnectionMonitor::new(
        Arc::new(client),
        presence.clone(),
        settings.monitor.clone(),
    );
    let color = output::should_color(&global.color);

    if !global.quiet {
        eprintln!(
            "Watching {url} every {}s (Ctrl-C to stop)",
            period.as_secs()
        );
    }

    // Initial state first, then only transitions.
    let connected = monitor.check_connection().await;
    emit(&global.output, Transition { timestamp: Utc::now(), connected }, color)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = monitor.on_connection_change(move |connected| {
        let _ = tx.send(Transition {
            timestamp: Utc::now(),
            connected,
        });
    });

    let cancel = CancellationToken::new();
    let watcher = presence::spawn_watcher(
        presence,
        url,
        period,
        settings.monitor.probe_timeout,
        cancel.clone(),
    );
    // The initial state above already cost one probe.
    monitor.resume_monitoring(Some(period));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let result = loop {
        tokio::select! {
            res = &mut shutdown => break res.map_err(CliError::from),
            Some(transition) = rx.recv() => {
                if let Err(e) = emit(&global.output, transition, color) {
                    break Err(e);
                }
            }
        }
    };

    debug!("stopping monitor");
    monitor.stop_monitoring();
    subscription.unsubscribe();
    cancel.cancel();
    let _ = watcher.await;
    result
}

fn emit(format: &OutputFormat, transition: Transition, color: bool) -> Result<(), CliError> {
    let line = match format {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_single(
            &OutputFormat::JsonCompact,
            &transition,
            |_| String::new(),
            |_| String::new(),
        )?,
        OutputFormat::Yaml => output::render_single(
            &OutputFormat::Yaml,
            &[transition],
            |_| String::new(),
            |_| String::new(),
        )?,
        OutputFormat::Table | OutputFormat::Plain => describe(transition, color),
    };
    output::print_output(line.trim_end(), false);
    Ok(())
}

fn describe(transition: Transition, color: bool) -> String {
    let state = match (transition.connected, color) {
        (true, true) => "connected".green().to_string(),
        (false, true) => "disconnected".red().to_string(),
        (true, false) => "connected".into(),
        (false, false) => "disconnected".into(),
    };
    format!("{} {state}", transition.timestamp.format("%Y-%m-%d %H:%M:%S"))
}
