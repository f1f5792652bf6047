//! Connectivity and health-diagnostics layer between `fairdesk-api` and
//! its consumers (CLI, dashboards, background jobs).
//!
//! The crate answers one question: *can we currently reach the data
//! service, and in how much detail is it healthy?*
//!
//! - **[`ConnectionMonitor`]**: long-lived reachability observer. Owns a
//!   single boolean, probes the canary resource on an interval, reacts to
//!   [`NetworkPresence`] transitions, and notifies subscribers only when
//!   the state actually flips.
//!
//! - **[`Diagnostics`]**: stateless, on-demand probes that reduce into
//!   report shapes: [`QuickCheck`], [`StartupHealth`],
//!   [`DiagnosticReport`] and [`NetworkCheck`]. None of them ever return
//!   an error; failures are encoded in the value.
//!
//! - **[`classify`]**: the one definition of "transport failure" shared
//!   by the monitor and every diagnostic, so "connected" cannot drift.
//!
//! - **[`DataService`]**: the boundary trait over the remote service,
//!   implemented for [`fairdesk_api::ServiceClient`].

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod monitor;
pub mod presence;
pub mod probe;
pub mod report;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::{
    ClassificationVerdict, ErrorReport, FailureKind, FailureSignal, classify, failure_kind,
    is_transport_failure,
};
pub use config::{DiagnosticsConfig, MonitorConfig, ServiceConfig, TlsVerification};
pub use diagnostics::Diagnostics;
pub use error::CoreError;
pub use monitor::{ConnectionMonitor, Subscription};
pub use presence::NetworkPresence;
pub use probe::{DataService, Probe, ProbeOutcome, run_probe};
pub use report::{
    DiagnosticReport, EnvPresence, NetworkCheck, OverallStatus, ProbeResult, ProbeStatus,
    QuickCheck, StartupHealth,
};

pub use fairdesk_api::{ServiceClient, Session};
