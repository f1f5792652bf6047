use serde::{Deserialize, Serialize};

/// The authenticated user behind the current access token.
///
/// Returned by `GET /auth/v1/user`. Only the fields diagnostics care
/// about are kept; everything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "id")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
