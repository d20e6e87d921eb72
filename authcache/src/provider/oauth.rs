//! Authorization-code exchange on the `oauth2` crate

use async_trait::async_trait;
use chrono::Utc;
use oauth2::{
    basic::{BasicClient, BasicTokenType},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use reqwest::Client as HttpClient;
use std::time::Duration;

use super::{ProviderClient, ProviderToken};
use crate::binding::BindingConfig;
use crate::error::{Error, Result, ValidationError};

/// Default timeout for calls to the token endpoint
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Type alias for a client with authorization and token endpoints set
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provider client for standard OAuth2 servers
#[derive(Clone)]
pub struct OAuth2Client {
    client: ConfiguredClient,
    http_client: HttpClient,
    scopes: Vec<String>,
}

impl OAuth2Client {
    /// Create a client from binding configuration
    pub fn new(config: &BindingConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_PROVIDER_TIMEOUT)
    }

    /// Create a client whose token requests give up after `timeout`
    pub fn with_timeout(config: &BindingConfig, timeout: Duration) -> Result<Self> {
        let auth_url = config
            .resolved_auth_url()
            .ok_or(ValidationError::EmptyAuthUrl)?;
        let token_url = config
            .resolved_token_url()
            .ok_or(ValidationError::EmptyTokenUrl)?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(auth_url.to_string())
                    .map_err(|e| ValidationError::InvalidUrl(format!("authorization URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(token_url.to_string())
                    .map_err(|e| ValidationError::InvalidUrl(format!("token URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(|e| ValidationError::InvalidUrl(format!("redirect URL: {}", e)))?,
            );

        let http_client = HttpClient::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent("authcache")
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
            scopes: config.scopes.clone(),
        })
    }

    /// The HTTP client used for token requests
    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }
}

#[async_trait]
impl ProviderClient for OAuth2Client {
    fn authorization_url(&self, state: &str) -> String {
        let mut auth_request = self
            .client
            .authorize_url(|| CsrfToken::new(state.to_string()));

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (url, _) = auth_request
            .add_extra_param("access_type", "online")
            .url();
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| Error::External(format!("Token exchange failed: {}", e)))?;

        let token_type = match token_result.token_type() {
            BasicTokenType::Bearer => "Bearer".to_string(),
            BasicTokenType::Mac => "MAC".to_string(),
            BasicTokenType::Extension(other) => other.clone(),
        };

        let mut token = ProviderToken::new(token_result.access_token().secret().clone(), token_type);
        if let Some(refresh) = token_result.refresh_token() {
            token = token.with_refresh_token(refresh.secret().clone());
        }
        if let Some(lifetime) = token_result
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
        {
            token = token.with_expiry(Utc::now() + lifetime);
        }

        Ok(token)
    }
}
