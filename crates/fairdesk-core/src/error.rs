// ── Core error types ──
//
// Domain-level errors from fairdesk-core. Monitor and diagnostics
// operations never return these (they encode failure in their values);
// they surface from setup paths such as building the service client.
// The `From<fairdesk_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to data service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Data service request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Service error code (e.g. "PGRST116", "42501").
        code: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Data service is not configured: missing {missing}")]
    NotConfigured { missing: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fairdesk_api::Error> for CoreError {
    fn from(err: fairdesk_api::Error) -> Self {
        let reached = !err.is_transport();
        match err {
            fairdesk_api::Error::InvalidCredential { message } => {
                CoreError::AuthenticationFailed { message }
            }
            fairdesk_api::Error::Transport(ref e) => {
                if reached {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            fairdesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            fairdesk_api::Error::InvalidResource(name) => CoreError::Config {
                message: format!("Invalid resource name: {name:?}"),
            },
            fairdesk_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            fairdesk_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            fairdesk_api::Error::Api {
                status,
                code,
                message,
                hint: _,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            fairdesk_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
