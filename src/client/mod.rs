//! The iBroadcast API client.
//!
//! [`Client`] holds the authenticated session (via
//! [`TokenManager`](crate::management::TokenManager)), the client identity
//! sent with every request, and the in-memory library caches. Build one
//! through [`ClientBuilder`], whose terminal methods are the mutually
//! exclusive ways of obtaining a first token set:
//!
//! - [`ClientBuilder::from_device_code`] — OAuth 2 Device Code Flow
//! - [`ClientBuilder::from_auth_code`] — Authorization Code Flow with PKCE
//! - [`ClientBuilder::from_token_set`] — restore a previously saved session
//! - [`ClientBuilder::from_tokens`] — inject tokens obtained out-of-band
//!
//! ```rust,ignore
//! let client = Client::builder("my-client-id")
//!     .device_name("living-room")
//!     .scopes(["library", "upload"])
//!     .on_token_refreshed(Arc::new(|set| save_somewhere(set)))
//!     .from_device_code(|device| {
//!         println!("Visit {} and enter {}", device.verification_uri, device.user_code);
//!     })
//!     .await?;
//! ```

use std::collections::{HashMap, HashSet};

use reqwest::StatusCode;
use reqwest::header::USER_AGENT;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    config::Endpoints,
    error::{Error, Result},
    management::{TokenManager, TokenRefreshedCallback},
    oauth,
    types::{
        ClientIdentity, DeviceAuthorization, PkceChallenge, Record, TokenSet,
        is_unauthenticated_body,
    },
};

mod library;
mod playlists;
mod tags;
mod upload;

/// Authenticated iBroadcast client with in-memory library caches.
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) identity: ClientIdentity,
    pub(crate) endpoints: Endpoints,
    pub(crate) tokens: TokenManager,

    // Library data, populated by refresh_library().
    pub(crate) albums: HashMap<String, Record>,
    pub(crate) artists: HashMap<String, Record>,
    pub(crate) playlists: HashMap<String, Record>,
    pub(crate) tags: HashMap<String, Record>,
    pub(crate) tracks: HashMap<String, Record>,
    pub(crate) md5: Option<HashSet<String>>,
    pub(crate) status: Option<Value>,
}

impl Client {
    pub fn builder(client_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(client_id)
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// The token manager backing this client. Shareable across tasks when
    /// the tokens are needed outside the client itself.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Snapshot of the current token set, e.g. for persistence.
    pub async fn token_set(&self) -> TokenSet {
        self.tokens.token_set().await
    }

    /// Revoke this session's refresh token. The client is unusable for
    /// authenticated calls afterwards; re-run an authorization flow.
    pub async fn revoke(&self) -> Result<()> {
        let set = self.tokens.token_set().await;
        oauth::revoke_token(&self.endpoints, &self.identity.client_id, &set.refresh_token).await
    }

    /// Common JSON body for API requests.
    pub(crate) fn request_body(&self, mode: &str, extra: Map<String, Value>) -> Value {
        let mut body = Map::new();
        body.insert("client".into(), self.identity.client_name.clone().into());
        body.insert("version".into(), self.identity.version.clone().into());
        body.insert("device_name".into(), self.identity.device_name.clone().into());
        body.insert("user_agent".into(), self.identity.user_agent().into());
        body.insert("mode".into(), mode.into());
        body.extend(extra);
        Value::Object(body)
    }

    /// POST a JSON-mode request to the main API host.
    pub(crate) async fn json_mode_request(
        &self,
        mode: &str,
        extra: Map<String, Value>,
    ) -> Result<Value> {
        let url = format!("{}/{}", self.endpoints.api_url, mode);
        self.json_request_at(&url, mode, extra).await
    }

    /// POST a JSON-mode request to an explicit URL, with the bounded
    /// refresh policy: refresh proactively when the recorded expiry has
    /// passed, and on a 401 (or an `"authenticated": false` body) refresh
    /// once and retry the request once before surfacing the failure.
    pub(crate) async fn json_request_at(
        &self,
        url: &str,
        mode: &str,
        extra: Map<String, Value>,
    ) -> Result<Value> {
        let body = self.request_body(mode, extra);
        let bearer = self.tokens.bearer_token().await?;

        debug!(mode, url, "api request");
        let (status, json) = self.post_json(url, &body, &bearer).await?;
        if status == StatusCode::UNAUTHORIZED || is_unauthenticated_body(&json) {
            let bearer = self.tokens.refresh_after_reject(&bearer).await?;
            let (status, json) = self.post_json(url, &body, &bearer).await?;
            return check_api_response(status, json);
        }
        check_api_response(status, json)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: &str,
    ) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .post(url)
            .header(USER_AGENT, self.identity.user_agent())
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;
        response_json(response).await
    }
}

/// Status plus body-as-JSON; a non-JSON body is carried as a string so the
/// status can still drive the error path without losing the payload.
pub(crate) async fn response_json(response: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let text = response.text().await?;
    let json = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text));
    Ok((status, json))
}

/// Interpret an API response body: surface non-2xx as [`Error::Server`],
/// log the server's `message`, and fail on `"result": false`.
pub(crate) fn check_api_response(status: StatusCode, body: Value) -> Result<Value> {
    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        return Err(Error::Server {
            status: status.as_u16(),
            message,
        });
    }

    if let Some(message) = body.get("message").and_then(Value::as_str) {
        info!("{message}");
    }
    if body.get("result").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("operation failed")
            .to_string();
        return Err(Error::OperationFailed(message));
    }
    Ok(body)
}

/// Configures and constructs a [`Client`]; see the module docs.
pub struct ClientBuilder {
    identity: ClientIdentity,
    endpoints: Endpoints,
    scopes: Vec<String>,
    refreshed_callback: Option<TokenRefreshedCallback>,
}

impl ClientBuilder {
    pub fn new(client_id: impl Into<String>) -> Self {
        ClientBuilder {
            identity: ClientIdentity::new(client_id),
            endpoints: Endpoints::default(),
            scopes: Vec::new(),
            refreshed_callback: None,
        }
    }

    /// Replace the whole identity (client name, version, device name).
    pub fn identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn device_name(mut self, device_name: impl Into<String>) -> Self {
        self.identity.device_name = device_name.into();
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.identity.client_secret = Some(client_secret.into());
        self
    }

    /// Override the service endpoints (tests, staging).
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Capability tags to request during authorization. Carried verbatim;
    /// enforcement is server-side.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Called with every refreshed token set so the caller can persist it.
    pub fn on_token_refreshed(mut self, callback: TokenRefreshedCallback) -> Self {
        self.refreshed_callback = Some(callback);
        self
    }

    /// Authenticate via the Device Code Flow.
    ///
    /// `on_device_code` is invoked once with the user code and
    /// verification URI so the caller can display them; the call then
    /// blocks (async) polling the token endpoint until the user
    /// authorizes, the code expires, or the server reports a terminal
    /// error.
    pub async fn from_device_code<F>(self, on_device_code: F) -> Result<Client>
    where
        F: FnOnce(&DeviceAuthorization),
    {
        let device = oauth::device_code_request(
            &self.endpoints,
            &self.identity.client_id,
            &self.scopes,
        )
        .await?;
        on_device_code(&device);

        let token_set = oauth::poll_for_token(
            &self.endpoints,
            &self.identity.client_id,
            self.identity.client_secret.as_deref(),
            &device,
        )
        .await?;
        Ok(self.finish(token_set))
    }

    /// Authenticate via the Authorization Code Flow with PKCE.
    ///
    /// `code` is the authorization code from the redirect the caller
    /// handled (after verifying the `state` parameter), `code_verifier`
    /// the PKCE verifier whose challenge was embedded in the
    /// authorization URL built with [`ClientBuilder::authorize_url`].
    pub async fn from_auth_code(
        self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<Client> {
        let token_set = oauth::exchange_auth_code(
            &self.endpoints,
            &self.identity.client_id,
            self.identity.client_secret.as_deref(),
            code,
            redirect_uri,
            code_verifier,
        )
        .await?;
        Ok(self.finish(token_set))
    }

    /// Restore a client from a previously saved token set. No network
    /// round-trip; an expired set is refreshed lazily on first use.
    pub fn from_token_set(self, token_set: TokenSet) -> Client {
        self.finish(token_set)
    }

    /// Build a client from access/refresh tokens obtained out-of-band.
    /// Expiry is unknown, so the first refresh happens reactively.
    pub fn from_tokens(
        self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Client {
        self.finish(TokenSet::new(access_token, refresh_token))
    }

    /// Authorization URL for the PKCE flow, embedding this builder's
    /// client id and scopes. The caller opens it in the user's browser
    /// and checks `state` on the redirect.
    pub fn authorize_url(
        &self,
        state: &str,
        pkce: &PkceChallenge,
        redirect_uri: &str,
    ) -> Result<String> {
        oauth::build_authorize_url(
            &self.endpoints,
            &self.identity.client_id,
            state,
            pkce,
            &self.scopes,
            redirect_uri,
        )
    }

    fn finish(self, token_set: TokenSet) -> Client {
        let mut tokens = TokenManager::new(
            self.identity.client_id.clone(),
            self.identity.client_secret.clone(),
            self.endpoints.clone(),
            token_set,
        );
        if let Some(callback) = self.refreshed_callback {
            tokens.on_token_refreshed(callback);
        }

        Client {
            http: reqwest::Client::new(),
            identity: self.identity,
            endpoints: self.endpoints,
            tokens,
            albums: HashMap::new(),
            artists: HashMap::new(),
            playlists: HashMap::new(),
            tags: HashMap::new(),
            tracks: HashMap::new(),
            md5: None,
            status: None,
        }
    }
}
