//! Host network presence, approximated by resolving the service host.
//!
//! The core only consumes a [`NetworkPresence`] flag; this module is the
//! CLI's platform feed for it.

use std::net::IpAddr;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use fairdesk_core::NetworkPresence;

/// `true` if the URL's host resolves to at least one address in time.
///
/// IP literals need no lookup. A URL without a host counts as present:
/// there is nothing to resolve, and the probe will report the problem.
pub async fn host_resolves(url: &Url, timeout: Duration) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    let port = url.port_or_known_default().unwrap_or(443);

    match tokio::time::timeout(timeout, tokio::net::lookup_host((host, port))).await {
        Ok(Ok(mut addrs)) => addrs.next().is_some(),
        Ok(Err(e)) => {
            debug!(host, error = %e, "host lookup failed");
            false
        }
        Err(_) => {
            debug!(host, "host lookup timed out");
            false
        }
    }
}

/// Resolve once and publish the result.
pub async fn refresh(presence: &NetworkPresence, url: &Url, timeout: Duration) -> bool {
    let online = host_resolves(url, timeout).await;
    if presence.set_online(online) {
        info!(online, "network presence changed");
    }
    online
}

/// Re-resolve the host every `period` until `cancel` fires.
pub fn spawn_watcher(
    presence: NetworkPresence,
    url: Url,
    period: Duration,
    lookup_timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    refresh(&presence, &url, lookup_timeout).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        raw.parse().unwrap_or_else(|e| panic!("bad test url {raw}: {e}"))
    }

    #[tokio::test]
    async fn ip_literals_need_no_lookup() {
        let timeout = Duration::from_millis(10);
        assert!(host_resolves(&url("http://127.0.0.1:1"), timeout).await);
        assert!(host_resolves(&url("http://[::1]:8080"), timeout).await);
    }

    #[tokio::test]
    async fn invalid_tld_does_not_resolve() {
        let presence = NetworkPresence::online();
        let online = refresh(
            &presence,
            &url("https://fairdesk-test.invalid"),
            Duration::from_secs(5),
        )
        .await;
        assert!(!online);
        assert!(!presence.is_online());
    }
}
