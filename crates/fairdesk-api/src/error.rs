use thiserror::Error;

/// Top-level error type for the `fairdesk-api` crate.
///
/// Covers every failure mode of the hosted data service surface:
/// transport, timeouts, structured service errors, and decoding.
/// `fairdesk-core` classifies these into reachability verdicts.
#[derive(Debug, Error)]
pub enum Error {
    // ── Credentials ─────────────────────────────────────────────────
    /// The API key or access token cannot be used as a header value.
    #[error("Invalid credential: {message}")]
    InvalidCredential { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource names end up in the request path, so only a safe subset is allowed.
    #[error("Invalid resource name: {0:?}")]
    InvalidResource(String),

    /// Request timed out on the client side.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS configuration error (bad CA file, client build failure).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Service ─────────────────────────────────────────────────────
    /// Structured error returned by the service (`{code, message, hint}` body).
    #[error("Service error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        hint: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status attached to this error, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Service error code (e.g. `PGRST116`, `42501`), if available.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The bare message, without the variant prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if the request never completed at the service:
    /// connect/DNS failures, resets, and client-side timeouts.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().is_none() && !e.is_builder() && !e.is_decode(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the request was never sent: the URL, resource
    /// name, credentials or TLS setup were unusable before any I/O.
    pub fn is_unsent(&self) -> bool {
        match self {
            Self::InvalidCredential { .. }
            | Self::InvalidUrl(_)
            | Self::InvalidResource(_)
            | Self::Tls(_) => true,
            Self::Transport(e) => e.is_builder(),
            _ => false,
        }
    }

    /// Returns `true` if the service answered with 401/403.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}
