// ── Failure classification ──
//
// The single definition of "the request never reached the service".
// The monitor, every diagnostic, and any caller donating a caught error
// go through these functions, so "connected" means the same thing
// everywhere in the application.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// HTTP statuses that mean a gateway in front of the service gave up.
pub const TRANSPORT_STATUSES: [u16; 2] = [503, 504];

/// Message fragments that browsers, fetch shims and HTTP stacks use for
/// requests that never completed.
pub const TRANSPORT_MESSAGE_PATTERNS: [&str; 3] =
    ["Failed to fetch", "NetworkError", "Network request failed"];

/// Error codes the service uses for credential or permission problems.
const AUTH_CODES: [&str; 3] = ["42501", "PGRST301", "PGRST302"];

// ── FailureSignal ────────────────────────────────────────────────

/// Anything that can be classified: the view of an error the rules need.
///
/// Implemented for [`fairdesk_api::Error`], [`CoreError`] and
/// [`ErrorReport`]. Code outside this crate that catches its own error
/// type can either implement this trait or convert into an `ErrorReport`.
pub trait FailureSignal {
    /// Human-readable message, matched against the transport patterns.
    fn message(&self) -> Cow<'_, str>;

    /// HTTP status, if the service (or a gateway) answered.
    fn status(&self) -> Option<u16> {
        None
    }

    /// Service error code (`PGRST116`, `42501`, ...).
    fn code(&self) -> Option<&str> {
        None
    }

    /// Typed transport flag for errors that know they never reached the
    /// service (connect failure, DNS, client-side timeout).
    fn is_transport(&self) -> bool {
        false
    }
}

impl FailureSignal for fairdesk_api::Error {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(fairdesk_api::Error::message(self))
    }

    fn status(&self) -> Option<u16> {
        fairdesk_api::Error::status(self)
    }

    fn code(&self) -> Option<&str> {
        fairdesk_api::Error::code(self)
    }

    fn is_transport(&self) -> bool {
        fairdesk_api::Error::is_transport(self)
    }
}

impl FailureSignal for CoreError {
    fn message(&self) -> Cow<'_, str> {
        match self {
            Self::Api { message, .. } => Cow::Borrowed(message),
            other => Cow::Owned(other.to_string()),
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }

    fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    fn is_transport(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

// ── ErrorReport ──────────────────────────────────────────────────

/// A plain, owned description of an error caught anywhere in the
/// application: a message plus optional status and code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// An error that carries nothing but an HTTP status.
    pub fn from_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl FailureSignal for ErrorReport {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn status(&self) -> Option<u16> {
        self.status
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl From<&fairdesk_api::Error> for ErrorReport {
    fn from(err: &fairdesk_api::Error) -> Self {
        Self {
            message: err.message(),
            status: err.status(),
            code: err.code().map(str::to_owned),
        }
    }
}

// ── Verdicts ─────────────────────────────────────────────────────

/// Output of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub is_network_error: bool,
}

/// Error taxonomy surfaced by diagnostics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Required URL or credential missing. Never network related.
    Configuration,
    /// The request never reached or never completed at the service.
    Transport,
    /// The service answered but rejected the caller's credentials.
    AuthDenied,
    /// The service answered with an error for one resource.
    Resource,
    /// Anything the rules above did not anticipate (panics, bugs).
    Unexpected,
}

/// `true` if the error means the service was not reached.
///
/// Everything else, including 401/403, "no rows" and policy
/// violations, means the request was processed by the service.
pub fn is_transport_failure<E: FailureSignal + ?Sized>(err: &E) -> bool {
    if err.is_transport() {
        return true;
    }
    if err
        .status()
        .is_some_and(|status| TRANSPORT_STATUSES.contains(&status))
    {
        return true;
    }
    let message = err.message();
    TRANSPORT_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

pub fn classify<E: FailureSignal + ?Sized>(err: &E) -> ClassificationVerdict {
    ClassificationVerdict {
        is_network_error: is_transport_failure(err),
    }
}

/// Place an error in the [`FailureKind`] taxonomy.
///
/// Only ever returns `Transport`, `AuthDenied` or `Resource`; the other
/// two kinds are assigned by the caller at its own boundary.
pub fn failure_kind<E: FailureSignal + ?Sized>(err: &E) -> FailureKind {
    if is_transport_failure(err) {
        return FailureKind::Transport;
    }
    let auth_status = matches!(err.status(), Some(401 | 403));
    let auth_code = err.code().is_some_and(|code| AUTH_CODES.contains(&code));
    if auth_status || auth_code || err.message().contains("JWT") {
        FailureKind::AuthDenied
    } else {
        FailureKind::Resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_to_fetch_is_transport() {
        assert!(is_transport_failure(&ErrorReport::new("TypeError: Failed to fetch")));
        assert!(is_transport_failure(&ErrorReport::new(
            "NetworkError when attempting to fetch resource."
        )));
    }

    #[test]
    fn gateway_statuses_are_transport() {
        assert!(is_transport_failure(&ErrorReport::from_status(503)));
        assert!(is_transport_failure(&ErrorReport::from_status(504)));
        assert!(!is_transport_failure(&ErrorReport::from_status(500)));
    }

    #[test]
    fn reached_service_errors_are_not_transport() {
        assert!(!is_transport_failure(&ErrorReport::from_status(401)));
        assert!(!is_transport_failure(
            &ErrorReport::new("JSON object requested, multiple (or no) rows returned")
                .with_code("PGRST116")
                .with_status(406)
        ));
        assert!(!is_transport_failure(&ErrorReport::new(
            "Validation failed: brand required"
        )));
    }

    #[test]
    fn business_messages_mentioning_networks_are_not_transport() {
        assert!(!is_transport_failure(&ErrorReport::new(
            "Network booth 12 is already assigned"
        )));
    }

    #[test]
    fn api_timeout_is_transport() {
        let err = fairdesk_api::Error::Timeout { timeout_ms: 5000 };
        assert!(classify(&err).is_network_error);
        assert_eq!(failure_kind(&err), FailureKind::Transport);
    }

    #[test]
    fn api_service_unavailable_is_transport() {
        let err = fairdesk_api::Error::Api {
            status: 503,
            code: None,
            message: "Service Unavailable".into(),
            hint: None,
        };
        assert!(is_transport_failure(&err));
    }

    #[test]
    fn auth_denied_variants() {
        assert_eq!(
            failure_kind(&ErrorReport::new("permission denied").with_code("42501")),
            FailureKind::AuthDenied
        );
        assert_eq!(
            failure_kind(&ErrorReport::new("JWT expired").with_code("PGRST301")),
            FailureKind::AuthDenied
        );
        assert_eq!(
            failure_kind(&ErrorReport::new("invalid JWT")),
            FailureKind::AuthDenied
        );
        assert_eq!(
            failure_kind(&ErrorReport::from_status(403)),
            FailureKind::AuthDenied
        );
    }

    #[test]
    fn other_service_errors_are_resource_errors() {
        assert_eq!(
            failure_kind(&ErrorReport::new("relation \"fairs\" does not exist").with_code("42P01")),
            FailureKind::Resource
        );
    }

    #[test]
    fn core_errors_classify() {
        let err = CoreError::ConnectionFailed {
            url: "https://project.example.co".into(),
            reason: "dns error".into(),
        };
        assert!(is_transport_failure(&err));

        let err = CoreError::Api {
            message: "duplicate key value".into(),
            code: Some("23505".into()),
            status: Some(409),
        };
        assert!(!is_transport_failure(&err));
    }

    #[test]
    fn error_report_from_api_error() {
        let err = fairdesk_api::Error::Api {
            status: 406,
            code: Some("PGRST116".into()),
            message: "no rows".into(),
            hint: None,
        };
        let report = ErrorReport::from(&err);
        assert_eq!(report.status, Some(406));
        assert_eq!(report.code.as_deref(), Some("PGRST116"));
        assert_eq!(report.message, "no rows");
    }
}
