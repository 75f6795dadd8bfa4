//! OAuth 2 flows for iBroadcast authentication.
//!
//! Supports the Device Code Flow (for CLI/headless apps) and the
//! Authorization Code Flow with PKCE (for apps with a browser redirect),
//! plus token refresh and revocation. These are the low-level building
//! blocks; [`crate::client::ClientBuilder`] wires them into ready clients.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::{
    config::Endpoints,
    error::{Error, Result},
    types::{DeviceAuthorization, PkceChallenge, TokenResponse, TokenSet},
};

/// Extra wait added to the poll interval when the server answers `slow_down`.
const SLOW_DOWN_BACKOFF: Duration = Duration::from_secs(5);

/// Request a device code for the Device Code Flow.
///
/// The returned [`DeviceAuthorization`] carries the code the user must
/// enter, the verification URI to show them, and the polling parameters
/// for [`poll_for_token`].
pub async fn device_code_request(
    endpoints: &Endpoints,
    client_id: &str,
    scopes: &[String],
) -> Result<DeviceAuthorization> {
    let scope = scopes.join(" ");
    let response = Client::new()
        .get(&endpoints.device_code_url)
        .query(&[("client_id", client_id), ("scope", scope.as_str())])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(server_error(response).await);
    }
    Ok(response.json().await?)
}

/// Poll the token endpoint until the user authorizes (Device Code Flow).
///
/// Polls at the server-specified interval, backing off on `slow_down`.
/// The wait is bounded by the device code's `expires_in`: once the
/// deadline passes (or the server reports `expired_token`) the flow fails
/// with [`Error::AuthorizationExpired`] and no further polls are made.
/// `access_denied` maps to [`Error::AuthorizationDenied`].
///
/// The future can be raced against a caller-side timeout or cancellation
/// with `tokio::select!`.
pub async fn poll_for_token(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
    device: &DeviceAuthorization,
) -> Result<TokenSet> {
    let deadline = Instant::now() + Duration::from_secs(device.expires_in);
    let mut interval = Duration::from_secs(device.interval.max(1));

    loop {
        if Instant::now() >= deadline {
            return Err(Error::AuthorizationExpired);
        }
        sleep(interval).await;

        match poll_device_token(endpoints, client_id, client_secret, &device.device_code).await {
            Err(Error::AuthorizationPending) => {
                debug!("authorization pending, polling again");
            }
            Err(Error::OAuth { error, .. }) if error == "slow_down" => {
                interval += SLOW_DOWN_BACKOFF;
                debug!(interval_secs = interval.as_secs(), "server asked to slow down");
            }
            other => return other,
        }
    }
}

/// Single poll of the token endpoint for a pending device authorization.
///
/// Returns [`Error::AuthorizationPending`] while the user has not yet
/// authorized; [`poll_for_token`] loops over this.
pub async fn poll_device_token(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
    device_code: &str,
) -> Result<TokenSet> {
    let mut form = vec![
        ("grant_type", "device_code"),
        ("client_id", client_id),
        ("device_code", device_code),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }

    let response = Client::new()
        .post(&endpoints.token_url)
        .form(&form)
        .send()
        .await?;
    token_set_from(response, None).await
}

/// Exchange an authorization code for tokens (Authorization Code Flow).
///
/// `code_verifier` must be the PKCE verifier whose challenge was embedded
/// in the authorization URL, and `redirect_uri` must match the one used
/// there.
pub async fn exchange_auth_code(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<TokenSet> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("client_id", client_id),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("code_verifier", code_verifier),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }

    let response = Client::new()
        .post(&endpoints.token_url)
        .form(&form)
        .send()
        .await?;
    token_set_from(response, None).await
}

/// Refresh an access token using a refresh token.
///
/// Returns a whole new [`TokenSet`]; if the server does not rotate the
/// refresh token, the old one is carried over. A rejected refresh token
/// surfaces as [`Error::InvalidGrant`].
pub async fn refresh_access_token(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<TokenSet> {
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("client_id", client_id),
        ("refresh_token", refresh_token),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }

    let response = Client::new()
        .post(&endpoints.token_url)
        .form(&form)
        .send()
        .await?;
    token_set_from(response, Some(refresh_token)).await
}

/// Revoke a refresh token.
pub async fn revoke_token(
    endpoints: &Endpoints,
    client_id: &str,
    refresh_token: &str,
) -> Result<()> {
    let response = Client::new()
        .post(&endpoints.revoke_url)
        .form(&[("client_id", client_id), ("refresh_token", refresh_token)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(server_error(response).await);
    }
    Ok(())
}

/// Build the authorization URL for the Authorization Code Flow.
///
/// The caller directs the user's browser here, then verifies that the
/// `state` query parameter on the redirect matches the `state` passed in
/// (the library never sees the redirect, so that check is the caller's).
pub fn build_authorize_url(
    endpoints: &Endpoints,
    client_id: &str,
    state: &str,
    pkce: &PkceChallenge,
    scopes: &[String],
    redirect_uri: &str,
) -> Result<String> {
    let scope = scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", client_id),
        ("state", state),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", pkce.method),
        ("scope", scope.as_str()),
        ("redirect_uri", redirect_uri),
    ];
    let url = Url::parse_with_params(&endpoints.authorize_url, &params)
        .map_err(|e| Error::InvalidResponse(format!("invalid authorize url: {e}")))?;
    Ok(url.into())
}

/// Interpret a token endpoint response as a [`TokenSet`] or a typed error.
async fn token_set_from(response: Response, previous_refresh_token: Option<&str>) -> Result<TokenSet> {
    let status = response.status();
    let text = response.text().await?;
    let body: serde_json::Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) if !status.is_success() => {
            return Err(Error::Server {
                status: status.as_u16(),
                message: text,
            });
        }
        Err(e) => return Err(e.into()),
    };

    if status.is_success() && body.get("access_token").is_some() {
        let parsed: TokenResponse = serde_json::from_value(body)?;
        return Ok(TokenSet::from_response(parsed, previous_refresh_token));
    }

    let error = body.get("error").and_then(serde_json::Value::as_str);
    let description = body
        .get("error_description")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    Err(match error {
        Some("authorization_pending") => Error::AuthorizationPending,
        Some("expired_token") => Error::AuthorizationExpired,
        Some("access_denied") => Error::AuthorizationDenied,
        Some("invalid_grant") => Error::InvalidGrant(description),
        Some(error) => Error::OAuth {
            error: error.to_string(),
            description,
        },
        None => Error::Server {
            status: status.as_u16(),
            message: body.to_string(),
        },
    })
}

async fn server_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Error::Server { status, message }
}
