// Connection state plus subscriber registry.
//
// The flag, the subscriber set and the queue of undelivered transitions
// share one lock. No lock is held while a subscriber runs: the first
// thread to queue a transition drains the queue, and transitions queued
// meanwhile (from other threads or from inside a subscriber) are
// delivered by that same thread in the order they were stored.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{info, warn};

pub(crate) type Callback = Arc<dyn Fn(bool) + Send + Sync>;

struct Transition {
    connected: bool,
    subscribers: Vec<(u64, Callback)>,
}

struct State {
    connected: bool,
    subscribers: BTreeMap<u64, Callback>,
    pending: VecDeque<Transition>,
    delivering: bool,
}

pub(crate) struct Listeners {
    state: Mutex<State>,
    tx: watch::Sender<bool>,
    next_id: AtomicU64,
}

impl Listeners {
    pub(crate) fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self {
            state: Mutex::new(State {
                connected,
                subscribers: BTreeMap::new(),
                pending: VecDeque::new(),
                delivering: false,
            }),
            tx,
            next_id: AtomicU64::new(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub(crate) fn len(&self) -> usize {
        self.state().subscribers.len()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub(crate) fn add(self: &Arc<Self>, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.state().subscribers.insert(id, callback);
        Subscription {
            listeners: Arc::downgrade(self),
            id,
        }
    }

    fn remove(&self, id: u64) -> bool {
        self.state().subscribers.remove(&id).is_some()
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.state().subscribers.contains_key(&id)
    }

    /// Store `connected` and tell everyone, but only on a transition.
    /// Returns whether the state changed.
    ///
    /// If another call is already delivering, the transition is queued
    /// for it and this call returns without waiting.
    pub(crate) fn notify(&self, connected: bool) -> bool {
        {
            let mut state = self.state();
            if state.connected == connected {
                return false;
            }
            state.connected = connected;
            self.tx.send_replace(connected);
            let subscribers = state
                .subscribers
                .iter()
                .map(|(id, callback)| (*id, Arc::clone(callback)))
                .collect();
            state.pending.push_back(Transition {
                connected,
                subscribers,
            });
            if state.delivering {
                return true;
            }
            state.delivering = true;
        }

        self.drain();
        true
    }

    fn drain(&self) {
        loop {
            let Transition {
                connected,
                subscribers,
            } = {
                let mut state = self.state();
                let Some(next) = state.pending.pop_front() else {
                    state.delivering = false;
                    return;
                };
                next
            };
            info!(connected, subscribers = subscribers.len(), "connection state changed");

            for (id, callback) in subscribers {
                // Removed since the transition was stored.
                if !self.is_subscribed(id) {
                    continue;
                }
                if panic::catch_unwind(AssertUnwindSafe(|| callback(connected))).is_err() {
                    warn!(connected, "connection subscriber panicked");
                }
            }
        }
    }
}

/// Handle returned by
/// [`on_connection_change`](super::ConnectionMonitor::on_connection_change).
///
/// Dropping it keeps the subscription alive; call
/// [`unsubscribe`](Self::unsubscribe) to remove the callback.
#[must_use = "keep the Subscription to be able to unsubscribe later"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    id: u64,
}

impl Subscription {
    /// Remove the callback. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
