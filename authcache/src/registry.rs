//! Binding registry: many providers behind one router
//!
//! Bindings are registered on a [`RegistryBuilder`] and frozen by
//! [`RegistryBuilder::build`], which validates each one (including a cache
//! liveness check) and mounts every callback path on an [`axum::Router`].
//!
//! ```rust,ignore
//! let registry = RegistryBuilder::new(sessions, cache)
//!     .register("/oauth/github", github_config)?
//!     .register("/oauth/facebook", Registration::new(facebook_config)
//!         .with_processor(Arc::new(IdentityLookup::facebook(sink))))?
//!     .build()
//!     .await?;
//!
//! let app = registry.router();
//! let client = registry.get_client_by_name(&headers, "github").await?;
//! ```

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request},
    response::Response,
    routing::get,
    Router,
};
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::binding::{self, BindingConfig, PostAuthProcessor, ProviderBinding};
use crate::cache::TokenCache;
use crate::config::BindingSettings;
use crate::error::{Error, Result};
use crate::provider::{
    AuthenticatedClient, OAuth2Client, ProviderClient, DEFAULT_PROVIDER_TIMEOUT,
};
use crate::session::SessionStore;

/// Everything needed to register one binding
pub struct Registration {
    pub config: BindingConfig,
    /// Custom provider client; an [`OAuth2Client`] is built when absent
    pub provider: Option<Arc<dyn ProviderClient>>,
    pub processor: Option<Arc<dyn PostAuthProcessor>>,
}

impl Registration {
    pub fn new(config: BindingConfig) -> Self {
        Self {
            config,
            provider: None,
            processor: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn PostAuthProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }
}

impl From<BindingConfig> for Registration {
    fn from(config: BindingConfig) -> Self {
        Self::new(config)
    }
}

/// Collects bindings before the registry is frozen
pub struct RegistryBuilder {
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn TokenCache>,
    provider_timeout: Duration,
    bindings: Vec<Arc<ProviderBinding>>,
}

impl RegistryBuilder {
    pub fn new(sessions: Arc<dyn SessionStore>, cache: Arc<dyn TokenCache>) -> Self {
        Self {
            sessions,
            cache,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            bindings: Vec::new(),
        }
    }

    /// Timeout for token exchanges and authenticated provider calls
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Register a binding on `path`
    ///
    /// # Errors
    ///
    /// Fails on an empty or non-literal path, or on a path, name or session
    /// cookie name already registered. A configuration missing a required
    /// field or carrying endpoint URLs that do not parse fails too.
    pub fn register(
        mut self,
        path: impl Into<String>,
        registration: impl Into<Registration>,
    ) -> Result<Self> {
        let path = path.into();
        let registration = registration.into();

        binding::check_path(&path)?;
        registration.config.validate()?;

        if self.bindings.iter().any(|b| b.path() == path) {
            return Err(Error::DuplicatePath(path));
        }
        if self
            .bindings
            .iter()
            .any(|b| b.name() == registration.config.name)
        {
            return Err(Error::DuplicateName(registration.config.name));
        }
        let session_name = registration.config.session_name();
        if self
            .bindings
            .iter()
            .any(|b| b.session_name() == session_name)
        {
            return Err(Error::DuplicateSessionName(session_name));
        }

        let provider = match registration.provider {
            Some(provider) => provider,
            None => Arc::new(OAuth2Client::with_timeout(
                &registration.config,
                self.provider_timeout,
            )?),
        };

        let http = reqwest::Client::builder()
            .timeout(self.provider_timeout)
            .user_agent("authcache")
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let mut binding = ProviderBinding::new(
            path,
            registration.config,
            provider,
            self.sessions.clone(),
            self.cache.clone(),
        )
        .with_http_client(http);
        if let Some(processor) = registration.processor {
            binding = binding.with_processor(processor);
        }

        tracing::debug!(
            binding = %binding.name(),
            path = %binding.path(),
            "Registered provider binding"
        );
        self.bindings.push(Arc::new(binding));
        Ok(self)
    }

    /// Register every `[bindings.<name>]` table from configuration
    pub fn register_all(self, bindings: &BTreeMap<String, BindingSettings>) -> Result<Self> {
        bindings.values().try_fold(self, |builder, settings| {
            builder.register(settings.path.clone(), settings.binding.clone())
        })
    }

    /// Validate every binding and freeze the registry
    pub async fn build(self) -> Result<BindingRegistry> {
        try_join_all(self.bindings.iter().map(|binding| async move {
            binding.validate().await.map_err(|e| {
                tracing::error!(binding = %binding.name(), error = %e, "Binding validation failed");
                e
            })
        }))
        .await?;

        let mut router = Router::new();
        for binding in &self.bindings {
            router = router.route(binding.path(), get(callback).with_state(binding.clone()));
        }
        let router = router.layer(TraceLayer::new_for_http());

        tracing::info!(bindings = self.bindings.len(), "Binding registry ready");

        let bindings = self
            .bindings
            .into_iter()
            .map(|binding| (binding.name().to_string(), binding))
            .collect();

        Ok(BindingRegistry { bindings, router })
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn callback(
    State(binding): State<Arc<ProviderBinding>>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    binding
        .handle_callback(params.code.as_deref(), &headers)
        .await
}

/// Immutable set of bindings and the router serving their callbacks
#[derive(Clone)]
pub struct BindingRegistry {
    bindings: BTreeMap<String, Arc<ProviderBinding>>,
    router: Router,
}

impl BindingRegistry {
    /// Router with one `GET` route per callback path
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Route one request to the binding registered on its path
    ///
    /// Unknown paths get a 404.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Recover the authenticated client of the named binding
    ///
    /// Unknown names fail before any session or cache access.
    pub async fn get_client_by_name(
        &self,
        headers: &HeaderMap,
        name: &str,
    ) -> Result<AuthenticatedClient> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| Error::UnknownBinding(name.to_string()))?;
        binding.get_client(headers).await
    }

    pub fn binding(&self, name: &str) -> Option<&Arc<ProviderBinding>> {
        self.bindings.get(name)
    }

    /// Registered binding names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("bindings", &self.bindings.values().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
