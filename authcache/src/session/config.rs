//! Session cookie configuration types.

use axum_extra::extract::cookie::{Key, SameSite};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum secret length accepted for cookie signing keys.
pub const MIN_SECRET_LEN: usize = 64;

/// Session cookie configuration.
///
/// # Example
///
/// ```toml
/// [session]
/// secret = "a random string of at least 64 bytes ..."
/// max_age_secs = 86400
/// secure = true
/// http_only = true
/// same_site = "lax"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Secret used to derive the cookie signing key.
    ///
    /// Must be at least 64 bytes. When absent a random key is generated,
    /// which invalidates every cookie on restart.
    #[serde(default)]
    pub secret: Option<String>,

    /// Cookie path.
    ///
    /// Default: `"/"`
    #[serde(default = "default_cookie_path")]
    pub path: String,

    /// Cookie domain (optional).
    #[serde(default)]
    pub domain: Option<String>,

    /// Secure cookie flag (HTTPS only).
    ///
    /// Default: `true`
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// HttpOnly cookie flag.
    ///
    /// Default: `true`
    #[serde(default = "default_http_only")]
    pub http_only: bool,

    /// SameSite cookie policy: `"strict"`, `"lax"` or `"none"`.
    ///
    /// Default: `"lax"`
    #[serde(default = "default_same_site")]
    pub same_site: String,

    /// Cookie lifetime in seconds.
    ///
    /// - `0`: Session cookie (expires when browser closes)
    /// - `> 0`: Persistent cookie with specified lifetime
    ///
    /// Default: `86400` (24 hours)
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl SessionConfig {
    /// Derive the cookie signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if a secret is configured but shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn key(&self) -> Result<Key> {
        match &self.secret {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
                Error::Session(format!(
                    "session secret must be at least {MIN_SECRET_LEN} bytes"
                ))
            }),
            None => {
                tracing::warn!("No session secret configured, generating an ephemeral key");
                Ok(Key::generate())
            }
        }
    }

    pub(crate) fn same_site(&self) -> SameSite {
        match self.same_site.to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            path: default_cookie_path(),
            domain: None,
            secure: default_secure(),
            http_only: default_http_only(),
            same_site: default_same_site(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_http_only() -> bool {
    true
}

fn default_same_site() -> String {
    "lax".to_string()
}

fn default_max_age_secs() -> u64 {
    86400 // 24 hours
}
