// ── Diagnostics ──
//
// On-demand probes reduced into report shapes. Every entry point returns a
// plain value: configuration gaps, auth problems, outages and even panics
// inside a sweep end up encoded in the report, never as an `Err`.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::classify::{FailureKind, failure_kind};
use crate::config::{DiagnosticsConfig, ServiceConfig};
use crate::error::CoreError;
use crate::monitor::ConnectionMonitor;
use crate::presence::NetworkPresence;
use crate::probe::{DataService, run_probe, run_read_probe, with_timeout};
use crate::report::{
    DiagnosticReport, EnvPresence, NetworkCheck, ProbeResult, QuickCheck, StartupHealth,
};
use fairdesk_api::ServiceClient;

/// Entry point for every health diagnostic.
///
/// Holds no state between calls. A monitor can be attached so that a
/// reachable canary is reported to it; diagnostics never report an
/// outage to the monitor and never read its state.
pub struct Diagnostics<S> {
    service: Option<Arc<S>>,
    env: EnvPresence,
    presence: NetworkPresence,
    monitor: Option<ConnectionMonitor<S>>,
    config: DiagnosticsConfig,
}

impl Diagnostics<ServiceClient> {
    /// Build from resolved service settings. A missing URL or key is not
    /// an error here; it is what the diagnostics report on.
    pub fn from_service_config(
        service: &ServiceConfig,
        config: DiagnosticsConfig,
    ) -> Result<Self, CoreError> {
        let client = service.build_client()?.map(Arc::new);
        Ok(Self::new(client, service.presence(), config))
    }
}

impl<S: DataService> Diagnostics<S> {
    pub fn new(service: Option<Arc<S>>, env: EnvPresence, config: DiagnosticsConfig) -> Self {
        Self {
            service,
            env,
            presence: NetworkPresence::online(),
            monitor: None,
            config,
        }
    }

    #[must_use]
    pub fn with_presence(mut self, presence: NetworkPresence) -> Self {
        self.presence = presence;
        self
    }

    #[must_use]
    pub fn with_monitor(mut self, monitor: ConnectionMonitor<S>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    pub fn env(&self) -> EnvPresence {
        self.env
    }

    fn configured_service(&self) -> Option<&S> {
        if self.env.is_complete() {
            self.service.as_deref()
        } else {
            None
        }
    }

    fn missing_settings(&self) -> String {
        let missing = self.env.missing();
        if missing.is_empty() {
            "client could not be built".to_owned()
        } else {
            format!("missing {}", missing.join(" and "))
        }
    }

    /// Positive verdicts only; outages are left to the monitor's own probe.
    fn report_reachable(&self, reached: bool) {
        if reached {
            if let Some(monitor) = &self.monitor {
                monitor.notify_listeners(true);
            }
        }
    }

    // ── Quick check ──────────────────────────────────────────────────

    /// One canary probe, reduced to success plus a display message.
    pub async fn run_quick_check(&self) -> QuickCheck {
        let Some(service) = self.configured_service() else {
            let detail = self.missing_settings();
            warn!(%detail, "quick check skipped, data service not configured");
            return QuickCheck::failure(
                FailureKind::Configuration,
                "Data service is not configured",
                Some(detail),
            );
        };

        let probe = run_probe(service, &self.config.canary, self.config.probe_timeout).await;
        self.report_reachable(probe.is_connected());

        let Some(err) = probe.error() else {
            debug!(latency_ms = probe.latency_ms(), "quick check passed");
            return QuickCheck::success(format!("Connected ({} ms)", probe.latency_ms()));
        };

        let kind = if probe.is_unsent() {
            FailureKind::Configuration
        } else {
            failure_kind(err)
        };
        warn!(%kind, error = %err, "quick check failed");
        let message = match kind {
            FailureKind::AuthDenied => "Access denied, check credentials",
            FailureKind::Configuration => "Data service settings are invalid",
            _ => "Could not connect to the data service",
        };
        QuickCheck::failure(kind, message, Some(err.message()))
    }

    // ── Startup health ───────────────────────────────────────────────

    /// Configuration, reachability, session and row-policy summary.
    pub async fn run_startup_health_check(&self) -> StartupHealth {
        let timestamp = Utc::now();
        let env = self.env;

        let Some(service) = self.configured_service() else {
            warn!(detail = %self.missing_settings(), "startup health: not configured");
            return StartupHealth {
                env,
                connection: false,
                auth: false,
                rls: false,
                latency_ms: 0,
                timestamp,
            };
        };

        let timeout = self.config.probe_timeout;
        let canary = run_probe(service, &self.config.canary, timeout).await;
        let connection = canary.is_connected();
        self.report_reachable(connection);

        let session = match with_timeout(timeout, service.current_session(timeout)).await {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "session lookup failed");
                None
            }
        };
        let auth = session.is_some();

        let rls = if auth {
            let read = run_read_probe(service, &self.config.policy_resource, timeout).await;
            if let Some(e) = read.error() {
                warn!(resource = %read.resource, error = %e, "policy read failed");
            }
            read.succeeded()
        } else {
            false
        };

        let health = StartupHealth {
            env,
            connection,
            auth,
            rls,
            latency_ms: canary.latency_ms(),
            timestamp,
        };
        info!(
            connection,
            auth,
            rls,
            latency_ms = health.latency_ms,
            "startup health check"
        );
        health
    }

    // ── Resource sweep ───────────────────────────────────────────────

    /// Probe `resources` in order. The first one is the canary: if it
    /// fails, the sweep fails regardless of the rest.
    pub async fn run_resource_sweep<R: AsRef<str>>(&self, resources: &[R]) -> DiagnosticReport {
        let timestamp = Utc::now();

        let Some(service) = self.configured_service() else {
            let detail = self.missing_settings();
            warn!(%detail, "sweep skipped, data service not configured");
            return DiagnosticReport::fatal(
                timestamp,
                format!("Data service is not configured: {detail}"),
            );
        };
        if resources.is_empty() {
            warn!("sweep requested with no resources");
            return DiagnosticReport::fatal(timestamp, "no resources to probe");
        }

        let names: Vec<&str> = resources.iter().map(AsRef::as_ref).collect();
        let swept = AssertUnwindSafe(self.sweep(service, &names))
            .catch_unwind()
            .await;

        match swept {
            Ok((results, canary_reached)) => {
                self.report_reachable(canary_reached);
                let report = DiagnosticReport::from_results(timestamp, results);
                info!(
                    status = %report.overall_status,
                    errors = report.error_count(),
                    total = report.resources.len(),
                    latency_ms = report.latency_ms,
                    "resource sweep finished"
                );
                report
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(%message, "resource sweep aborted");
                DiagnosticReport::fatal(timestamp, format!("unexpected failure: {message}"))
            }
        }
    }

    async fn sweep(&self, service: &S, names: &[&str]) -> (IndexMap<String, ProbeResult>, bool) {
        let mut seen = HashSet::with_capacity(names.len());
        let mut results = IndexMap::with_capacity(names.len());
        let mut canary_reached = false;

        for (index, name) in names.iter().copied().enumerate() {
            if !seen.insert(name) {
                warn!(resource = name, "duplicate resource in sweep, skipping");
                continue;
            }
            let probe = run_probe(service, name, self.config.probe_timeout).await;
            if index == 0 {
                canary_reached = probe.is_connected();
            }
            if let Some(e) = probe.error() {
                warn!(resource = name, error = %e, "resource probe failed");
            }
            results.insert(name.to_owned(), probe.to_result());
        }

        (results, canary_reached)
    }

    /// Sweep the configured default resource list.
    pub async fn run_default_sweep(&self) -> DiagnosticReport {
        self.run_resource_sweep(self.config.resources.as_slice()).await
    }

    // ── Minimal network check ────────────────────────────────────────

    /// Presence first; when offline no probe is attempted.
    pub async fn run_minimal_network_check(&self) -> NetworkCheck {
        let online = self.presence.is_online();
        let config_ok = self.env.is_complete();
        let unreachable = NetworkCheck {
            online,
            config_ok,
            reachable: false,
            latency_ms: None,
        };

        if !online {
            debug!("network check: host offline");
            return unreachable;
        }
        let Some(service) = self.configured_service() else {
            return unreachable;
        };

        let probe = run_probe(service, &self.config.canary, self.config.probe_timeout).await;
        let reachable = probe.is_connected();
        self.report_reachable(reachable);

        NetworkCheck {
            reachable,
            latency_ms: reachable.then(|| probe.latency_ms()),
            ..unreachable
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}
