// ── Probe execution ──
//
// `DataService` is the seam between the core and the remote service.
// `run_probe` times one canary-style call, races it against a client-side
// timeout and sorts the outcome using the shared classification rules.
// A request that could not even be built is never counted as reached.

use std::future::Future;
use std::time::Duration;

use fairdesk_api::{ServiceClient, Session};
use tokio::time::{self, Instant};
use tracing::debug;

use crate::classify::is_transport_failure;
use crate::report::{ProbeResult, ProbeStatus};

// ── DataService ──────────────────────────────────────────────────

/// The calls the diagnostics layer makes against the data service.
///
/// Implemented for [`ServiceClient`]; tests implement it with scripted
/// fakes. Every call receives the probe timeout so implementations can
/// also enforce it at the transport level.
pub trait DataService: Send + Sync + 'static {
    /// Row count of `resource` without transferring rows.
    fn count_rows(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<u64>, fairdesk_api::Error>> + Send;

    /// Read at most one row of `resource`; yields the number of rows seen.
    fn read_sample(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<usize, fairdesk_api::Error>> + Send;

    /// The signed-in session, or `None` if there is none.
    fn current_session(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Session>, fairdesk_api::Error>> + Send;
}

impl DataService for ServiceClient {
    async fn count_rows(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> Result<Option<u64>, fairdesk_api::Error> {
        ServiceClient::count_rows(self, resource, Some(timeout)).await
    }

    async fn read_sample(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> Result<usize, fairdesk_api::Error> {
        ServiceClient::read_sample(self, resource, Some(timeout))
            .await
            .map(|rows| rows.len())
    }

    async fn current_session(
        &self,
        timeout: Duration,
    ) -> Result<Option<Session>, fairdesk_api::Error> {
        ServiceClient::current_session(self, Some(timeout)).await
    }
}

// ── Outcomes ─────────────────────────────────────────────────────

/// How a single probe ended.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The service answered successfully.
    Reached { count: Option<u64> },
    /// The service answered with an error (auth, policy, missing table...).
    Rejected { error: fairdesk_api::Error },
    /// The request never reached or never completed at the service.
    Unreachable { error: fairdesk_api::Error },
    /// The request was never sent (bad resource name, URL or credential).
    Unsent { error: fairdesk_api::Error },
}

impl ProbeOutcome {
    /// Sort a failed call by the shared transport rules.
    pub fn from_error(error: fairdesk_api::Error) -> Self {
        if error.is_unsent() {
            Self::Unsent { error }
        } else if is_transport_failure(&error) {
            Self::Unreachable { error }
        } else {
            Self::Rejected { error }
        }
    }

    pub fn error(&self) -> Option<&fairdesk_api::Error> {
        match self {
            Self::Reached { .. } => None,
            Self::Rejected { error } | Self::Unreachable { error } | Self::Unsent { error } => {
                Some(error)
            }
        }
    }
}

/// A finished probe against one named resource.
#[derive(Debug)]
pub struct Probe {
    pub resource: String,
    pub outcome: ProbeOutcome,
    pub latency: Duration,
}

impl Probe {
    /// The reachability rule: the service answered, successfully or not.
    pub fn is_connected(&self) -> bool {
        matches!(
            self.outcome,
            ProbeOutcome::Reached { .. } | ProbeOutcome::Rejected { .. }
        )
    }

    /// Nothing was sent because the local setup is unusable.
    pub fn is_unsent(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Unsent { .. })
    }

    /// The service answered without an error.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Reached { .. })
    }

    pub fn error(&self) -> Option<&fairdesk_api::Error> {
        self.outcome.error()
    }

    pub fn latency_ms(&self) -> u64 {
        duration_ms(self.latency)
    }

    /// Per-resource row for a [`DiagnosticReport`](crate::DiagnosticReport).
    pub fn to_result(&self) -> ProbeResult {
        match &self.outcome {
            ProbeOutcome::Reached { count } => ProbeResult {
                status: ProbeStatus::Ok,
                detail: None,
                count: *count,
                latency_ms: self.latency_ms(),
            },
            ProbeOutcome::Rejected { error }
            | ProbeOutcome::Unreachable { error }
            | ProbeOutcome::Unsent { error } => ProbeResult {
                status: ProbeStatus::Error,
                detail: Some(error.message()),
                count: None,
                latency_ms: self.latency_ms(),
            },
        }
    }
}

// ── Execution ────────────────────────────────────────────────────

/// Run `call`, giving up after `timeout`.
///
/// Losing the race drops the call, which cancels the underlying request,
/// so nothing can arrive late.
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, fairdesk_api::Error>
where
    F: Future<Output = Result<T, fairdesk_api::Error>>,
{
    match time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(fairdesk_api::Error::Timeout {
            timeout_ms: duration_ms(timeout),
        }),
    }
}

/// Row-count probe against `resource`.
pub async fn run_probe<S: DataService>(service: &S, resource: &str, timeout: Duration) -> Probe {
    let started = Instant::now();
    let result = with_timeout(timeout, service.count_rows(resource, timeout)).await;
    finish(resource, started, result)
}

/// Single-row read probe against `resource`. The count is the number of
/// rows the caller could see (0 or 1).
pub async fn run_read_probe<S: DataService>(
    service: &S,
    resource: &str,
    timeout: Duration,
) -> Probe {
    let started = Instant::now();
    let result = with_timeout(timeout, service.read_sample(resource, timeout))
        .await
        .map(|rows| u64::try_from(rows).ok());
    finish(resource, started, result)
}

fn finish(
    resource: &str,
    started: Instant,
    result: Result<Option<u64>, fairdesk_api::Error>,
) -> Probe {
    let latency = started.elapsed();
    let outcome = match result {
        Ok(count) => ProbeOutcome::Reached { count },
        Err(error) => ProbeOutcome::from_error(error),
    };
    debug!(
        resource,
        latency_ms = duration_ms(latency),
        outcome = ?outcome,
        "probe finished"
    );
    Probe {
        resource: resource.to_owned(),
        outcome,
        latency,
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
