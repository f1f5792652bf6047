// ── Runtime configuration ──
//
// These types describe *how* to reach the data service and how the
// monitor and diagnostics behave. They carry credential data but never
// touch disk: the CLI (via fairdesk-config) builds them and hands them in.

use std::time::Duration;

use fairdesk_api::transport::{TlsMode, TransportConfig};
use fairdesk_api::ServiceClient;
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::report::EnvPresence;

/// Default client-side timeout for a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default period between monitor probes.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Resource whose probe decides reachability.
pub const DEFAULT_CANARY: &str = "profiles";

/// Resource read with the user's session to check row-level policies.
pub const DEFAULT_POLICY_RESOURCE: &str = "projects";

/// Resources covered by a default sweep. The first one is the canary.
pub const DEFAULT_SWEEP_RESOURCES: [&str; 4] = ["profiles", "projects", "fairs", "customers"];

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for the hosted service.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted development stacks).
    DangerAcceptInvalid,
}

/// How to reach the data service.
///
/// `url` and `api_key` are optional: a missing value is a reportable
/// configuration state, not a construction error.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub url: Option<Url>,
    pub api_key: Option<SecretString>,
    /// Signed-in user's access token, if any.
    pub access_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Client-wide request timeout (probes use their own, tighter one).
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// Presence-only view of the required settings.
    pub fn presence(&self) -> EnvPresence {
        EnvPresence {
            url_present: self.url.is_some(),
            key_present: self.api_key.is_some(),
        }
    }

    /// Build the HTTP client, or `Ok(None)` if URL or key is missing.
    pub fn build_client(&self) -> Result<Option<ServiceClient>, CoreError> {
        let (Some(url), Some(api_key)) = (self.url.as_ref(), self.api_key.as_ref()) else {
            return Ok(None);
        };

        let transport = TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: if self.request_timeout.is_zero() {
                TransportConfig::default().timeout
            } else {
                self.request_timeout
            },
        };

        let mut client = ServiceClient::new(url.as_str(), api_key, &transport)?;
        if let Some(token) = &self.access_token {
            client = client.with_access_token(token)?;
        }
        Ok(Some(client))
    }

    /// Like [`build_client`](Self::build_client), but a missing setting
    /// is an error.
    pub fn require_client(&self) -> Result<ServiceClient, CoreError> {
        let presence = self.presence();
        self.build_client()?.ok_or_else(|| CoreError::NotConfigured {
            missing: presence.missing().join(" and "),
        })
    }
}

/// Tuning for the [`ConnectionMonitor`](crate::ConnectionMonitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Canary resource probed on every check.
    pub canary: String,
    pub probe_timeout: Duration,
    /// Period used by `start_monitoring` callers that don't pass one.
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            canary: DEFAULT_CANARY.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            interval: DEFAULT_MONITOR_INTERVAL,
        }
    }
}

/// Probe sets and timeouts for [`Diagnostics`](crate::Diagnostics).
#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    pub canary: String,
    pub policy_resource: String,
    /// Default sweep list; the first entry is the canary of the sweep.
    pub resources: Vec<String>,
    pub probe_timeout: Duration,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            canary: DEFAULT_CANARY.into(),
            policy_resource: DEFAULT_POLICY_RESOURCE.into(),
            resources: DEFAULT_SWEEP_RESOURCES.iter().map(ToString::to_string).collect(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}
