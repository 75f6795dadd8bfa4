//! iBroadcast Client Library
//!
//! This library provides an authenticated client for the iBroadcast
//! music-library service: OAuth 2 authorization (Device Code Flow and
//! Authorization Code Flow with PKCE), transparent token refresh, library
//! retrieval, track/playlist/tag mutation and checksum-deduplicated file
//! upload.
//!
//! # Modules
//!
//! - `client` - The API client, its builder and the library operations
//! - `config` - Service endpoint configuration
//! - `error` - Error taxonomy and the crate `Result` alias
//! - `management` - Token lifecycle management
//! - `oauth` - Low-level OAuth 2 flow functions
//! - `types` - Data structures and wire formats
//! - `utils` - PKCE generation, payload decoding and checksums
//!
//! # Example
//!
//! ```rust,ignore
//! use ibroadcast::{Client, TokenSet};
//!
//! #[tokio::main]
//! async fn main() -> ibroadcast::Result<()> {
//!     let mut client = Client::builder("my-client-id")
//!         .scopes(["library"])
//!         .from_device_code(|device| {
//!             println!("To authorize, visit: {}", device.verification_uri);
//!             println!("And enter code: {}", device.user_code);
//!         })
//!         .await?;
//!
//!     client.refresh_library().await?;
//!     println!("{} tracks in library", client.tracks().len());
//!     Ok(())
//! }
//! ```
//!
//! Token persistence is the caller's job: serialize the [`TokenSet`]
//! (e.g. with [`TokenSet::to_value`]), store it anywhere, and restore the
//! session later with [`client::ClientBuilder::from_token_set`]. Register
//! a callback with [`client::ClientBuilder::on_token_refreshed`] to be
//! handed every refreshed set.

pub mod client;
pub mod config;
pub mod error;
pub mod management;
pub mod oauth;
pub mod types;
pub mod utils;

pub use client::{Client, ClientBuilder};
pub use config::Endpoints;
pub use error::{Error, Result};
pub use management::{TokenManager, TokenRefreshedCallback};
pub use types::{
    ClientIdentity, DeviceAuthorization, Mood, PkceChallenge, Record, TokenSet,
};
