use thiserror::Error;

/// Errors surfaced by OAuth flows and API operations.
///
/// The library retries internally only for expected device-flow polling
/// states and for the single refresh-and-retry on an unauthenticated
/// response; everything else propagates as one of these variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Device-flow poll answered before the user finished authorizing.
    /// Handled internally by the polling loop; surfaces only from
    /// single-step helpers.
    #[error("authorization pending")]
    AuthorizationPending,

    /// The device code expired before the user authorized.
    #[error("device authorization expired, restart the flow")]
    AuthorizationExpired,

    /// The user denied the authorization request.
    #[error("authorization denied by the user")]
    AuthorizationDenied,

    /// The refresh token was rejected (revoked or expired). The stored
    /// token set is left untouched; re-run one of the authorization flows.
    #[error("refresh token rejected: {0}")]
    InvalidGrant(String),

    /// Any other structured error from the token endpoint.
    #[error("oauth error: {error}: {description}")]
    OAuth { error: String, description: String },

    /// Non-2xx response from an API endpoint.
    #[error("server returned status {status}: {message}")]
    Server { status: u16, message: String },

    /// The server answered 2xx but reported the operation as failed.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// A response body that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
