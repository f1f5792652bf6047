// ── Host network presence ──
//
// A tiny cloneable handle over a `watch` channel carrying "the host has a
// network". The monitor binds to it; whoever knows the platform feeds it
// (the CLI uses a DNS watcher, tests flip it by hand).

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Shared "network present" flag with change notification.
#[derive(Debug, Clone)]
pub struct NetworkPresence {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkPresence {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// A handle that starts online.
    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publish a new presence value. Returns `true` if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            debug!(online, "network presence changed");
        }
        changed
    }

    /// Receiver that wakes on every presence transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkPresence {
    fn default() -> Self {
        Self::online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_online_reports_changes_only() {
        let presence = NetworkPresence::online();
        assert!(!presence.set_online(true));
        assert!(presence.set_online(false));
        assert!(!presence.is_online());
        assert!(!presence.set_online(false));
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let presence = NetworkPresence::online();
        let mut rx = presence.subscribe();
        let clone = presence.clone();

        clone.set_online(false);
        assert!(rx.changed().await.is_ok());
        assert!(!*rx.borrow_and_update());
    }
}
