//! Provider bindings: one configured provider plus its callback handling
//!
//! A [`ProviderBinding`] owns everything needed to finish an
//! authorization-code login for one provider and to recover an
//! authenticated client for the same browser later:
//!
//! 1. The callback mints a session identifier and stores it in the
//!    binding's signed session cookie.
//! 2. The code is exchanged for a [`ProviderToken`], which is cached under
//!    that identifier for the binding's TTL.
//! 3. [`ProviderBinding::get_client`] reads the identifier back from the
//!    cookie and rebuilds an [`AuthenticatedClient`] from the cache.

mod config;
mod processor;

pub use config::{BindingConfig, DEFAULT_CACHE_TTL_SECS, MAX_CACHE_TTL_SECS};
pub use processor::{IdentityLookup, IdentitySink, PostAuthProcessor};

use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Client as HttpClient;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::TokenCache;
use crate::error::{Error, Result, ValidationError};
use crate::provider::{AuthenticatedClient, ProviderClient, ProviderToken};
use crate::session::{SessionBag, SessionStore};

/// One identity provider mounted on one callback path
pub struct ProviderBinding {
    path: String,
    config: BindingConfig,
    session_name: String,
    provider: Arc<dyn ProviderClient>,
    processor: Option<Arc<dyn PostAuthProcessor>>,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn TokenCache>,
    http: HttpClient,
}

impl ProviderBinding {
    pub fn new(
        path: impl Into<String>,
        config: BindingConfig,
        provider: Arc<dyn ProviderClient>,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        Self {
            path: path.into(),
            session_name: config.session_name(),
            config,
            provider,
            processor: None,
            sessions,
            cache,
            http: HttpClient::new(),
        }
    }

    /// Run `processor` after every successful exchange
    pub fn with_processor(mut self, processor: Arc<dyn PostAuthProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// HTTP client used by the authenticated clients this binding hands out
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Where to send the browser to start a login
    pub fn login_url(&self, state: &str) -> String {
        self.provider.authorization_url(state)
    }

    /// Handle the provider's redirect back with `?code=`
    ///
    /// Once the session identifier is minted the session cookie is written
    /// on every outcome, including failures.
    pub async fn handle_callback(&self, code: Option<&str>, headers: &HeaderMap) -> Response {
        let Some(code) = code.filter(|code| !code.is_empty()) else {
            tracing::warn!(binding = %self.name(), "Authorization code empty");
            return Error::BadRequest("authorization code empty".to_string()).into_response();
        };

        let mut bag = match self.sessions.load(headers, &self.session_name).await {
            Ok(bag) => bag,
            Err(e) => {
                tracing::warn!(binding = %self.name(), error = %e, "Failed to get session cookie");
                return Error::BadRequest("failed to get session cookie".to_string())
                    .into_response();
            }
        };

        let sid = Uuid::new_v4().to_string();
        bag.set_session_id(sid.as_str());

        let mut response = match self.complete_login(&sid, code).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };

        self.save_session(&bag, &mut response).await;
        response
    }

    async fn complete_login(&self, sid: &str, code: &str) -> Result<Response> {
        let token = self.provider.exchange_code(code).await.map_err(|e| {
            tracing::warn!(binding = %self.name(), error = %e, "Code exchange failed");
            Error::BadRequest("failed to exchange authorization code for token".to_string())
        })?;

        let bytes = token.to_bytes().map_err(|e| {
            tracing::error!(binding = %self.name(), error = %e, "Token serialization failed");
            Error::Internal("failed to marshal jwt".to_string())
        })?;

        self.cache
            .set(sid, &bytes, self.config.cache_ttl())
            .await
            .map_err(|e| {
                tracing::error!(binding = %self.name(), error = %e, "Token cache write failed");
                Error::Internal("failed to cache token".to_string())
            })?;

        if let Some(processor) = &self.processor {
            let client = self.client_for(token);
            processor.process(self, &client).await.map_err(|e| {
                tracing::error!(binding = %self.name(), error = %e, "Post-auth processor failed");
                Error::Internal("failed to process function".to_string())
            })?;
        }

        tracing::info!(binding = %self.name(), "Login complete");
        Ok(Redirect::temporary(&self.config.redirect_to).into_response())
    }

    async fn save_session(&self, bag: &SessionBag, response: &mut Response) {
        if let Err(e) = self.sessions.save(bag, response.headers_mut()).await {
            tracing::error!(binding = %self.name(), error = %e, "Failed to save session cookie");
        }
    }

    /// Recover the authenticated client for the browser that sent `headers`
    ///
    /// # Errors
    ///
    /// * [`Error::NoSession`] - no cookie for this binding (the cache is not read)
    /// * [`Error::Session`] - the cookie failed verification or decoding
    /// * [`Error::MissingIdentifier`] - the cookie holds no session identifier
    /// * [`Error::CacheMiss`] - nothing live is cached for the identifier
    /// * [`Error::MalformedToken`] - the cached bytes are not a token
    pub async fn get_client(&self, headers: &HeaderMap) -> Result<AuthenticatedClient> {
        let bag = self.sessions.load(headers, &self.session_name).await?;
        if bag.is_new() {
            return Err(Error::NoSession);
        }

        let sid = bag.session_id().ok_or(Error::MissingIdentifier)?;
        let bytes = self.cache.get(sid).await?.ok_or(Error::CacheMiss)?;
        let token = ProviderToken::from_bytes(&bytes)?;

        Ok(self.client_for(token))
    }

    /// Recover the authenticated client and run `f` with it
    pub async fn with_client<F, Fut, T>(&self, headers: &HeaderMap, f: F) -> Result<T>
    where
        F: FnOnce(AuthenticatedClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let client = self.get_client(headers).await?;
        f(client).await
    }

    /// Wrap a token in a client sharing this binding's HTTP connection pool
    pub fn client_for(&self, token: ProviderToken) -> AuthenticatedClient {
        AuthenticatedClient::new(self.http.clone(), token)
    }

    /// Static checks: route path and configuration fields
    pub fn check_fields(&self) -> std::result::Result<(), ValidationError> {
        check_path(&self.path)?;
        self.config.validate()
    }

    /// Static checks plus a liveness check of the token cache
    pub async fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.check_fields()?;
        self.cache
            .ping()
            .await
            .map_err(|e| ValidationError::CacheUnreachable(e.to_string()))
    }
}

/// Callback paths are literal and absolute
pub(crate) fn check_path(path: &str) -> std::result::Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(ValidationError::RelativePath(path.to_string()));
    }
    // axum rejects segments starting with ':' or '*' at route time
    if path.contains(['{', '}', '*', '?', '#'])
        || path.split('/').any(|segment| segment.starts_with(':'))
    {
        return Err(ValidationError::InvalidPath(path.to_string()));
    }
    Ok(())
}

impl std::fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("name", &self.config.name)
            .field("path", &self.path)
            .field("session_name", &self.session_name)
            .field("has_processor", &self.processor.is_some())
            .finish_non_exhaustive()
    }
}
