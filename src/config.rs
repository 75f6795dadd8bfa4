//! Service endpoint configuration.
//!
//! All network-facing parts of the crate take an [`Endpoints`] value, so the
//! whole client can be pointed at a mock server in tests. [`Endpoints::default`]
//! targets the production hosts.

pub const OAUTH_BASE_URL: &str = "https://oauth.ibroadcast.com";
pub const API_URL: &str = "https://api.ibroadcast.com";
pub const LIBRARY_URL: &str = "https://library.ibroadcast.com";
pub const SYNC_URL: &str = "https://sync.ibroadcast.com";
pub const UPLOAD_URL: &str = "https://upload.ibroadcast.com";

/// Out-of-band redirect URI used when the caller has no HTTP redirect target.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Resolved endpoint URLs for one client instance.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub device_code_url: String,
    pub revoke_url: String,
    pub api_url: String,
    pub library_url: String,
    pub sync_url: String,
    pub upload_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: format!("{OAUTH_BASE_URL}/authorize"),
            token_url: format!("{OAUTH_BASE_URL}/token"),
            device_code_url: format!("{OAUTH_BASE_URL}/device/code"),
            revoke_url: format!("{OAUTH_BASE_URL}/revoke"),
            api_url: API_URL.to_string(),
            library_url: LIBRARY_URL.to_string(),
            sync_url: SYNC_URL.to_string(),
            upload_url: UPLOAD_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints with every URL rooted at `base`, for tests against a
    /// single mock server.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{base}/authorize"),
            token_url: format!("{base}/token"),
            device_code_url: format!("{base}/device/code"),
            revoke_url: format!("{base}/revoke"),
            api_url: base.to_string(),
            library_url: format!("{base}/library"),
            sync_url: format!("{base}/sync"),
            upload_url: format!("{base}/upload"),
        }
    }
}
