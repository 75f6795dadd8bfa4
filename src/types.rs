use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::utils;

/// One decoded library entity (album, artist, playlist, tag or track),
/// kept verbatim as the server sent it.
pub type Record = serde_json::Map<String, Value>;

/// The access/refresh token pair plus expiry metadata for one session.
///
/// A refresh replaces the whole set atomically; individual fields are never
/// mutated in place. Serialize/deserialize it (see [`TokenSet::to_value`])
/// to persist sessions externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp when the access token expires, if known.
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
            scope: Vec::new(),
        }
    }

    /// Build a set from a token endpoint response, converting the relative
    /// `expires_in` to an absolute timestamp. A response that omits
    /// `refresh_token` keeps `previous_refresh_token`.
    pub fn from_response(response: TokenResponse, previous_refresh_token: Option<&str>) -> Self {
        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh_token.map(str::to_string))
            .unwrap_or_default();

        Self {
            access_token: response.access_token,
            refresh_token,
            expires_at: response
                .expires_in
                .map(|secs| Utc::now().timestamp() + secs),
            scope: response.scope.map(ScopeField::into_vec).unwrap_or_default(),
        }
    }

    /// Whether the access token expires within the next `margin_secs`
    /// seconds. Unknown expiry counts as not expired; a rejected request
    /// triggers the refresh instead.
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => Utc::now().timestamp() >= at - margin_secs,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_within(0)
    }

    /// Plain key/value form for external persistence.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("token set serializes to json")
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Wire format of a token endpoint grant response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<ScopeField>,
}

/// The token endpoint returns `scope` either as a space-separated string
/// or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScopeField {
    List(Vec<String>),
    Text(String),
}

impl ScopeField {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ScopeField::List(list) => list,
            ScopeField::Text(text) => text.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Response from the device-authorization endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds to wait between token polls.
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
    /// Seconds until the device code expires.
    pub expires_in: u64,
}

fn default_poll_interval() -> u64 {
    5
}

/// PKCE verifier/challenge pair, generated per authorization attempt and
/// discarded after the code exchange.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub method: &'static str,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        Self::with_verifier(utils::generate_code_verifier())
    }

    pub fn with_verifier(verifier: String) -> Self {
        let challenge = utils::generate_code_challenge(&verifier);
        Self {
            verifier,
            challenge,
            method: "S256",
        }
    }
}

/// Who this client says it is, both to the OAuth endpoints (`client_id`)
/// and in API request bodies (`client_name`, `version`, `device_name`).
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub client_name: String,
    pub version: String,
    pub device_name: String,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>) -> Self {
        let client_name = env!("CARGO_PKG_NAME").to_string();
        Self {
            client_id: client_id.into(),
            client_secret: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: client_name.clone(),
            client_name,
        }
    }

    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.client_name, self.version)
    }
}

/// Mood used to autopopulate tracks when creating a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Party,
    Dance,
    Workout,
    Relaxed,
    Chill,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Party => "Party",
            Mood::Dance => "Dance",
            Mood::Workout => "Workout",
            Mood::Relaxed => "Relaxed",
            Mood::Chill => "Chill",
        }
    }
}

/// Marker the API sets on responses issued with a stale access token.
pub(crate) fn is_unauthenticated_body(body: &Value) -> bool {
    body.get("authenticated")
        .and_then(Value::as_bool)
        .is_some_and(|authenticated| !authenticated)
}
