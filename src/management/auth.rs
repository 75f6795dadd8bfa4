use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::{
    config::Endpoints,
    error::Result,
    oauth,
    types::TokenSet,
};

/// Called with the new set after every successful refresh, so the caller
/// can persist it.
pub type TokenRefreshedCallback = Arc<dyn Fn(&TokenSet) + Send + Sync>;

/// Refresh this early before the recorded expiry.
const REFRESH_MARGIN_SECS: i64 = 240;

/// Owns the current [`TokenSet`] and keeps it fresh.
///
/// The set lives behind an async mutex and refresh happens with the lock
/// held, so concurrent callers sharing one manager trigger at most one
/// refresh round-trip and always observe either the old or the new set,
/// never a partial one. A refresh failure leaves the stored set untouched.
pub struct TokenManager {
    client_id: String,
    client_secret: Option<String>,
    endpoints: Endpoints,
    current: Mutex<TokenSet>,
    refreshed_callback: Option<TokenRefreshedCallback>,
}

impl TokenManager {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        endpoints: Endpoints,
        token_set: TokenSet,
    ) -> Self {
        TokenManager {
            client_id: client_id.into(),
            client_secret,
            endpoints,
            current: Mutex::new(token_set),
            refreshed_callback: None,
        }
    }

    /// Register the persistence callback. Set this before sharing the
    /// manager across tasks.
    pub fn on_token_refreshed(&mut self, callback: TokenRefreshedCallback) {
        self.refreshed_callback = Some(callback);
    }

    /// Snapshot of the current token set.
    pub async fn token_set(&self) -> TokenSet {
        self.current.lock().await.clone()
    }

    /// Access token for the next request, refreshing first when the
    /// recorded expiry is within the refresh margin. A set with unknown
    /// expiry is returned as-is; [`TokenManager::refresh_after_reject`]
    /// covers it once the server rejects a request.
    pub async fn bearer_token(&self) -> Result<String> {
        let mut current = self.current.lock().await;
        if current.expires_within(REFRESH_MARGIN_SECS) {
            self.refresh_locked(&mut current).await?;
        }
        Ok(current.access_token.clone())
    }

    /// Reactive refresh after a request using `stale_access_token` came
    /// back unauthenticated. If another caller already swapped in a new
    /// set, returns that one without a second round-trip.
    pub async fn refresh_after_reject(&self, stale_access_token: &str) -> Result<String> {
        let mut current = self.current.lock().await;
        if current.access_token != stale_access_token {
            return Ok(current.access_token.clone());
        }
        self.refresh_locked(&mut current).await?;
        Ok(current.access_token.clone())
    }

    /// Force a refresh regardless of recorded expiry.
    pub async fn refresh(&self) -> Result<TokenSet> {
        let mut current = self.current.lock().await;
        self.refresh_locked(&mut current).await?;
        Ok(current.clone())
    }

    async fn refresh_locked(&self, current: &mut TokenSet) -> Result<()> {
        info!("refreshing access token");
        let new_set = oauth::refresh_access_token(
            &self.endpoints,
            &self.client_id,
            self.client_secret.as_deref(),
            &current.refresh_token,
        )
        .await?;

        *current = new_set;
        if let Some(callback) = &self.refreshed_callback {
            callback(current);
        }
        Ok(())
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}
