// ── Connection monitor ──
//
// Long-lived reachability observer. One boolean, one periodic canary
// probe, one binding to host network presence. Subscribers hear about
// transitions only.

mod listeners;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{FailureSignal, is_transport_failure};
use crate::config::{DEFAULT_MONITOR_INTERVAL, MonitorConfig};
use crate::presence::NetworkPresence;
use crate::probe::{DataService, ProbeOutcome, duration_ms, run_probe};

use self::listeners::Listeners;
pub use self::listeners::Subscription;

/// Process-wide view of "can we reach the data service".
///
/// Cheap to clone; all clones share the same state, subscribers and
/// background loop. The state starts as connected.
pub struct ConnectionMonitor<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    service: Arc<S>,
    presence: NetworkPresence,
    config: MonitorConfig,
    listeners: Arc<Listeners>,
    /// Checks currently running, explicit or periodic.
    in_flight: AtomicUsize,
    task: Mutex<Option<MonitorTask>>,
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MonitorTask {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.stop();
        }
    }
}

impl<S> Clone for ConnectionMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for ConnectionMonitor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("connected", &self.inner.listeners.is_connected())
            .field("subscribers", &self.inner.listeners.len())
            .field("canary", &self.inner.config.canary)
            .finish_non_exhaustive()
    }
}

/// Decrements the in-flight counter even if the check is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S: DataService> ConnectionMonitor<S> {
    pub fn new(service: Arc<S>, presence: NetworkPresence, config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                presence,
                config,
                listeners: Arc::new(Listeners::new(true)),
                in_flight: AtomicUsize::new(0),
                task: Mutex::new(None),
            }),
        }
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.inner.listeners.is_connected()
    }

    /// Receiver that follows the connection state.
    pub fn state(&self) -> watch::Receiver<bool> {
        self.inner.listeners.watch()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn presence(&self) -> &NetworkPresence {
        &self.inner.presence
    }

    /// Register `callback`, invoked with the new state on every transition.
    ///
    /// Callbacks run on whichever thread is delivering transitions and
    /// must not block. They may report back into this monitor; a transition
    /// raised from inside a callback is delivered after the current one.
    pub fn on_connection_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(callback))
    }

    /// Record a verdict. Subscribers are told only if it differs from the
    /// stored state.
    pub fn notify_listeners(&self, connected: bool) {
        self.inner.listeners.notify(connected);
    }

    // ── Checks ───────────────────────────────────────────────────────

    /// Probe the canary once and record the verdict.
    ///
    /// Anything the service answered, including auth and policy errors,
    /// counts as connected. A canary request that could not be sent does
    /// not. Never fails.
    pub async fn check_connection(&self) -> bool {
        let _guard = InFlight::enter(&self.inner.in_flight);
        let config = &self.inner.config;
        let probe = run_probe(self.inner.service.as_ref(), &config.canary, config.probe_timeout).await;

        match &probe.outcome {
            ProbeOutcome::Unreachable { error } => warn!(
                canary = %config.canary,
                latency_ms = probe.latency_ms(),
                error = %error,
                "data service unreachable"
            ),
            ProbeOutcome::Unsent { error } => warn!(
                canary = %config.canary,
                error = %error,
                "canary request could not be sent"
            ),
            ProbeOutcome::Rejected { error } => debug!(
                canary = %config.canary,
                error = %error,
                "canary rejected, service reachable"
            ),
            ProbeOutcome::Reached { .. } => {}
        }

        let connected = probe.is_connected();
        self.notify_listeners(connected);
        connected
    }

    /// `true` without I/O when already connected, otherwise one fresh check.
    pub async fn ensure_connected(&self) -> bool {
        if self.is_connected() {
            return true;
        }
        self.check_connection().await
    }

    /// Take evidence of an outage from any remote call.
    ///
    /// Returns `true` and marks the service unreachable if `err` is a
    /// transport failure; otherwise leaves the state alone.
    pub fn handle_connection_error<E: FailureSignal + ?Sized>(&self, err: &E) -> bool {
        if !is_transport_failure(err) {
            return false;
        }
        warn!(error = %err.message(), "transport failure reported by caller");
        self.notify_listeners(false);
        true
    }

    // ── Background loop ──────────────────────────────────────────────

    /// Start (or restart) periodic monitoring.
    ///
    /// Checks once immediately, then every `interval` (the configured
    /// default when `None`). Presence going online triggers a fresh check;
    /// presence going offline marks the service unreachable directly.
    /// Must be called within a Tokio runtime.
    pub fn start_monitoring(&self, interval: Option<Duration>) {
        self.spawn_loop(interval, true);
    }

    /// Like [`start_monitoring`](Self::start_monitoring), but the first
    /// periodic check waits one full interval. For callers that have just
    /// run [`check_connection`](Self::check_connection) themselves.
    pub fn resume_monitoring(&self, interval: Option<Duration>) {
        self.spawn_loop(interval, false);
    }

    fn spawn_loop(&self, interval: Option<Duration>, check_now: bool) {
        let mut period = interval.unwrap_or(self.inner.config.interval);
        if period.is_zero() {
            warn!("zero monitor interval, using {DEFAULT_MONITOR_INTERVAL:?}");
            period = DEFAULT_MONITOR_INTERVAL;
        }

        let mut slot = self.task_slot();
        if let Some(previous) = slot.take() {
            debug!("restarting connection monitor");
            previous.stop();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_task(
            Arc::downgrade(&self.inner),
            self.inner.presence.subscribe(),
            period,
            check_now,
            cancel.clone(),
        ));
        *slot = Some(MonitorTask { cancel, handle });
        info!(interval_ms = duration_ms(period), "connection monitor started");
    }

    /// Stop the loop and drop the presence binding. Safe to call when the
    /// monitor was never started.
    pub fn stop_monitoring(&self) {
        if let Some(task) = self.task_slot().take() {
            task.stop();
            info!("connection monitor stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.task_slot()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<MonitorTask>> {
        self.inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// A periodic check: skipped while another check runs, abandoned if
    /// the loop is cancelled mid-probe.
    async fn periodic_check(&self, cancel: &CancellationToken) {
        if self.inner.in_flight.load(Ordering::Acquire) > 0 {
            debug!("check already in flight, skipping tick");
            return;
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            _ = self.check_connection() => {}
        }
    }
}

/// The loop holds only a weak reference so dropping every monitor handle
/// ends it.
async fn monitor_task<S: DataService>(
    inner: Weak<Inner<S>>,
    mut presence: watch::Receiver<bool>,
    period: Duration,
    check_now: bool,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if !check_now {
        interval.reset();
    }
    let mut presence_open = true;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = presence.changed(), if presence_open => {
                if changed.is_err() {
                    presence_open = false;
                    continue;
                }
                let online = *presence.borrow_and_update();
                let Some(inner) = inner.upgrade() else { break };
                let monitor = ConnectionMonitor { inner };
                if online {
                    info!("network is back, checking connection");
                    monitor.periodic_check(&cancel).await;
                } else {
                    info!("network went away");
                    monitor.notify_listeners(false);
                }
            }
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                ConnectionMonitor { inner }.periodic_check(&cancel).await;
            }
        }
    }

    debug!("connection monitor loop exited");
}
