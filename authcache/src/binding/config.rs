use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ValidationError;
use crate::provider::ProviderPreset;

/// Default lifetime of a cached provider token: 730 minutes
pub const DEFAULT_CACHE_TTL_SECS: u64 = 730 * 60;

/// Longest accepted token lifetime: one year
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Static configuration of one provider binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Unique binding name, used for lookup and the default session name
    #[serde(default)]
    pub name: String,

    /// Where the browser is sent after a successful callback
    #[serde(default)]
    pub redirect_to: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Callback URL registered with the provider
    #[serde(default)]
    pub redirect_url: String,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// Well-known provider supplying default endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderPreset>,

    /// Authorization endpoint, overriding the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,

    /// Token endpoint, overriding the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// How long cached tokens live, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Session cookie name (defaults to `authcache_<name>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            redirect_to: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            scopes: Vec::new(),
            provider: None,
            auth_url: None,
            token_url: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            session_name: None,
        }
    }
}

impl BindingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Name of the session cookie carrying this binding's bag
    pub fn session_name(&self) -> String {
        match &self.session_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("authcache_{}", self.name),
        }
    }

    /// Authorization endpoint: explicit override, else the preset's
    pub fn resolved_auth_url(&self) -> Option<&str> {
        resolve(self.auth_url.as_deref(), self.provider.map(|p| p.auth_url()))
    }

    /// Token endpoint: explicit override, else the preset's
    pub fn resolved_token_url(&self) -> Option<&str> {
        resolve(self.token_url.as_deref(), self.provider.map(|p| p.token_url()))
    }

    /// Check every required field, reporting the first one missing
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.redirect_to.is_empty() {
            return Err(ValidationError::EmptyRedirectTo);
        }
        if self.scopes.is_empty() {
            return Err(ValidationError::EmptyScopes);
        }
        if self.client_id.is_empty() {
            return Err(ValidationError::EmptyClientId);
        }
        if self.client_secret.is_empty() {
            return Err(ValidationError::EmptyClientSecret);
        }
        if self.redirect_url.is_empty() {
            return Err(ValidationError::EmptyRedirectUrl);
        }
        if self.resolved_auth_url().is_none() {
            return Err(ValidationError::EmptyAuthUrl);
        }
        if self.resolved_token_url().is_none() {
            return Err(ValidationError::EmptyTokenUrl);
        }
        if self.cache_ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl);
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ValidationError::TtlTooLong(self.cache_ttl_secs));
        }
        Ok(())
    }
}

fn resolve<'a>(explicit: Option<&'a str>, preset: Option<&'static str>) -> Option<&'a str> {
    explicit.filter(|url| !url.is_empty()).or(preset)
}
