//! Identity provider integration
//!
//! A [`ProviderClient`] builds authorization URLs and exchanges codes for
//! [`ProviderToken`]s. [`OAuth2Client`] covers standard OAuth2 servers;
//! [`ProviderPreset`] fills in endpoints for well-known providers.

mod client;
mod oauth;
mod token;

pub use client::AuthenticatedClient;
pub use oauth::{OAuth2Client, DEFAULT_PROVIDER_TIMEOUT};
pub use token::ProviderToken;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// OAuth2 authorization-code primitives
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Authorization URL to redirect the browser to
    ///
    /// # Arguments
    ///
    /// * `state` - anti-forgery value echoed back on the callback
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token
    async fn exchange_code(&self, code: &str) -> Result<ProviderToken>;
}

/// Well-known providers with fixed endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPreset {
    Github,
    Google,
    Facebook,
}

impl ProviderPreset {
    pub fn auth_url(&self) -> &'static str {
        match self {
            ProviderPreset::Github => "https://github.com/login/oauth/authorize",
            ProviderPreset::Google => "https://accounts.google.com/o/oauth2/auth",
            ProviderPreset::Facebook => "https://www.facebook.com/v3.2/dialog/oauth",
        }
    }

    pub fn token_url(&self) -> &'static str {
        match self {
            ProviderPreset::Github => "https://github.com/login/oauth/access_token",
            ProviderPreset::Google => "https://oauth2.googleapis.com/token",
            ProviderPreset::Facebook => "https://graph.facebook.com/v3.2/oauth/access_token",
        }
    }
}

/// Generate a cryptographically secure random state value
pub fn generate_state() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
