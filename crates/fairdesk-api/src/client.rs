// Async HTTP client for the hosted data service.
//
// REST base: {url}/rest/v1/{resource}
// Auth base: {url}/auth/v1/
// Auth: `apikey` header on every request, plus `Authorization: Bearer`
// carrying the user access token when one is held (the API key otherwise).

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::session::Session;
use crate::transport::TransportConfig;

// ── Error response shape ─────────────────────────────────────────────

/// REST errors look like `{code, message, details, hint}`; the auth
/// endpoint uses `{code: 401, msg}` or `{error, error_description}`.
#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the hosted data service.
///
/// Every method is a single round trip; nothing is cached or retried.
/// Probes pass a per-call timeout that overrides the client-wide one.
#[derive(Debug)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: HeaderValue,
    /// `Bearer <api key>`, used when no user is signed in.
    anon_bearer: HeaderValue,
    /// `Bearer <access token>` for the signed-in user.
    user_bearer: Option<HeaderValue>,
    timeout: Duration,
}

impl ServiceClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL, API key and transport config.
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::from_reqwest(base_url, http, api_key)?;
        client.timeout = transport.timeout;
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        api_key: &SecretString,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let api_key_value = sensitive_header(api_key.expose_secret(), "API key")?;
        let anon_bearer = sensitive_header(&format!("Bearer {}", api_key.expose_secret()), "API key")?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key_value,
            anon_bearer,
            user_bearer: None,
            timeout: TransportConfig::default().timeout,
        })
    }

    /// Attach the signed-in user's access token.
    pub fn with_access_token(mut self, token: &SecretString) -> Result<Self, Error> {
        self.user_bearer = Some(sensitive_header(
            &format!("Bearer {}", token.expose_secret()),
            "access token",
        )?);
        Ok(self)
    }

    /// The normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether an access token is attached.
    pub fn has_access_token(&self) -> bool {
        self.user_bearer.is_some()
    }

    /// Ensure the base URL ends with a slash so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn rest_url(&self, resource: &str) -> Result<Url, Error> {
        validate_resource(resource)?;
        Ok(self.base_url.join(&format!("rest/v1/{resource}"))?)
    }

    fn auth_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("auth/v1/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.user_bearer.as_ref().unwrap_or(&self.anon_bearer);
        builder
            .header("apikey", self.api_key.clone())
            .header(AUTHORIZATION, bearer.clone())
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, Error> {
        let builder = match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        };
        let effective = timeout.unwrap_or(self.timeout);
        builder.send().await.map_err(|e| map_send_error(e, effective))
    }

    // ── Probes ───────────────────────────────────────────────────────

    /// Cheapest possible read: `limit=0` with an exact count.
    ///
    /// Returns the row count from `Content-Range` when the service
    /// reports one (`*/42`), `None` when it doesn't (`*/*`).
    pub async fn count_rows(
        &self,
        resource: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<u64>, Error> {
        let url = self.rest_url(resource)?;
        debug!("GET {url} (count)");

        let builder = self
            .authorize(self.http.get(url))
            .query(&[("select", "*"), ("limit", "0")])
            .header("Prefer", "count=exact");
        let resp = self.send(builder, timeout).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        Ok(resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range))
    }

    /// Read at most one row. Used to confirm that row-level policies
    /// allow the current session to see anything at all.
    pub async fn read_sample(
        &self,
        resource: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<serde_json::Value>, Error> {
        let url = self.rest_url(resource)?;
        debug!("GET {url} (sample)");

        let builder = self
            .authorize(self.http.get(url))
            .query(&[("select", "*"), ("limit", "1")]);
        let resp = self.send(builder, timeout).await?;
        handle_response(resp).await
    }

    /// Look up the user behind the attached access token.
    ///
    /// No token means no session and no request. A 401/403 from the auth
    /// endpoint means the token is expired or revoked, which is also
    /// "no session" rather than an error.
    pub async fn current_session(&self, timeout: Option<Duration>) -> Result<Option<Session>, Error> {
        let Some(bearer) = self.user_bearer.as_ref() else {
            return Ok(None);
        };

        let url = self.auth_url("user")?;
        debug!("GET {url}");

        let builder = self
            .http
            .get(url)
            .header("apikey", self.api_key.clone())
            .header(AUTHORIZATION, bearer.clone());
        let resp = self.send(builder, timeout).await?;

        match resp.status().as_u16() {
            401 | 403 => {
                debug!("access token rejected by auth endpoint");
                Ok(None)
            }
            _ => handle_response(resp).await.map(Some),
        }
    }
}

// ── Free helpers ─────────────────────────────────────────────────────

fn sensitive_header(value: &str, what: &str) -> Result<HeaderValue, Error> {
    let mut header = HeaderValue::from_str(value).map_err(|e| Error::InvalidCredential {
        message: format!("invalid {what} header value: {e}"),
    })?;
    header.set_sensitive(true);
    Ok(header)
}

/// Resource names are table/view identifiers: ASCII alphanumerics,
/// `_`, `-` and `.` (schema-qualified), nothing that changes the path.
fn validate_resource(resource: &str) -> Result<(), Error> {
    let valid = !resource.is_empty()
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidResource(resource.to_owned()))
    }
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        Error::Transport(err)
    }
}

/// Parse the total out of a `Content-Range` header (`0-9/42`, `*/42`).
fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
        let code = err.code.map(|c| match c {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Error::Api {
            status: status.as_u16(),
            message: err
                .message
                .or(err.error)
                .unwrap_or_else(|| status.to_string()),
            code,
            hint: err.hint,
        }
    } else {
        Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
            code: None,
            hint: None,
        }
    }
}
