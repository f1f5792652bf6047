// ── Report shapes ──
//
// Plain, fully-resolved values returned by the diagnostics. All of them
// serialize cleanly so the CLI can render them as JSON/YAML as-is.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classify::FailureKind;

// ── Configuration presence ───────────────────────────────────────

/// Whether the required settings exist. Values are never inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvPresence {
    pub url_present: bool,
    pub key_present: bool,
}

impl EnvPresence {
    pub fn is_complete(&self) -> bool {
        self.url_present && self.key_present
    }

    /// Human names of the missing settings, in a stable order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.url_present {
            missing.push("service URL");
        }
        if !self.key_present {
            missing.push("API key");
        }
        missing
    }
}

// ── Per-resource results ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProbeStatus {
    Ok,
    Error,
}

/// Outcome of one probe, as shown in a details table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    pub latency_ms: u64,
}

impl ProbeResult {
    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

// ── Sweep report ─────────────────────────────────────────────────

/// Aggregate classification of a sweep.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverallStatus {
    Success,
    Warning,
    Failure,
    /// No sweep has completed yet (initial value for displays).
    #[default]
    Pending,
}

/// Reduce sweep counts into an [`OverallStatus`].
///
/// Reachability comes from the canary alone; the other probes can only
/// downgrade a reachable service to `Warning`.
pub fn aggregate_status(canary_ok: bool, errors: usize, total: usize) -> OverallStatus {
    if !canary_ok || errors == total {
        OverallStatus::Failure
    } else if errors == 0 {
        OverallStatus::Success
    } else {
        OverallStatus::Warning
    }
}

/// The result of one sweep across named resources. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub timestamp: DateTime<Utc>,
    /// Round trip of the canary probe.
    pub latency_ms: u64,
    /// Per-resource results in probe order; the first entry is the canary.
    pub resources: IndexMap<String, ProbeResult>,
    pub overall_status: OverallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl DiagnosticReport {
    /// A report for a sweep that could not run at all.
    pub fn fatal(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            latency_ms: 0,
            resources: IndexMap::new(),
            overall_status: OverallStatus::Failure,
            fatal_error: Some(message.into()),
        }
    }

    /// Build from ordered probe results, deriving the overall status.
    pub fn from_results(
        timestamp: DateTime<Utc>,
        resources: IndexMap<String, ProbeResult>,
    ) -> Self {
        let canary = resources.first().map(|(_, r)| r);
        let canary_ok = canary.is_some_and(ProbeResult::is_ok);
        let latency_ms = canary.map_or(0, |r| r.latency_ms);
        let errors = resources.values().filter(|r| !r.is_ok()).count();
        let overall_status = aggregate_status(canary_ok, errors, resources.len());

        Self {
            timestamp,
            latency_ms,
            resources,
            overall_status,
            fatal_error: None,
        }
    }

    /// Name and result of the canary probe, if any probe ran.
    pub fn canary(&self) -> Option<(&str, &ProbeResult)> {
        self.resources.first().map(|(name, r)| (name.as_str(), r))
    }

    pub fn error_count(&self) -> usize {
        self.resources.values().filter(|r| !r.is_ok()).count()
    }
}

// ── Quick check ──────────────────────────────────────────────────

/// Fast boolean check with a display message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickCheck {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl QuickCheck {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            kind: None,
        }
    }

    pub(crate) fn failure(
        kind: FailureKind,
        message: impl Into<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            error,
            kind: Some(kind),
        }
    }
}

// ── Startup health ───────────────────────────────────────────────

/// Summary logged once when the application starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupHealth {
    pub env: EnvPresence,
    /// Canary reached (any non-transport answer counts).
    pub connection: bool,
    /// An authenticated session exists.
    pub auth: bool,
    /// Row-level policies let the session read the policy resource.
    pub rls: bool,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

// ── Minimal network check ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCheck {
    pub online: bool,
    pub config_ok: bool,
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}
