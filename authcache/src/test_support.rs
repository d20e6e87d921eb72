//! Fakes shared by unit tests

use async_trait::async_trait;
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use axum_extra::extract::cookie::Key;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::binding::BindingConfig;
use crate::cache::{MemoryTokenCache, TokenCache};
use crate::error::{Error, Result};
use crate::provider::{ProviderClient, ProviderToken};
use crate::session::{CookieSessionStore, SessionBag, SessionConfig, SessionStore};

/// A valid binding config with explicit endpoints
pub fn binding_config(name: &str) -> BindingConfig {
    BindingConfig {
        name: name.to_string(),
        redirect_to: "/home".to_string(),
        client_id: format!("{name}-client"),
        client_secret: format!("{name}-secret"),
        redirect_url: format!("https://app.example.com/oauth/{name}"),
        scopes: vec!["read:user".to_string()],
        auth_url: Some("https://idp.example.com/authorize".to_string()),
        token_url: Some("https://idp.example.com/token".to_string()),
        cache_ttl_secs: 3600,
        ..Default::default()
    }
}

pub fn session_store() -> Arc<CookieSessionStore> {
    Arc::new(CookieSessionStore::with_key(
        Key::generate(),
        SessionConfig {
            secure: false,
            ..Default::default()
        },
    ))
}

/// Turn the `Set-Cookie` headers of a response into a request `Cookie` header
pub fn echo_cookies(set_cookie: &HeaderMap) -> HeaderMap {
    let pairs: Vec<String> = set_cookie
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(|v| v.to_string())
        .collect();

    let mut headers = HeaderMap::new();
    if !pairs.is_empty() {
        headers.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
    }
    headers
}

/// Provider that answers every exchange with a fixed token, or fails
pub struct StaticProvider {
    token: Option<ProviderToken>,
    pub exchanges: AtomicUsize,
}

impl StaticProvider {
    pub fn returning(token: ProviderToken) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token),
            exchanges: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            exchanges: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProviderClient for StaticProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://idp.example.com/authorize?state={state}")
    }

    async fn exchange_code(&self, _code: &str) -> Result<ProviderToken> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.token
            .clone()
            .ok_or_else(|| Error::External("invalid_grant".to_string()))
    }
}

/// Memory cache that counts calls and can be told to fail
#[derive(Default)]
pub struct CountingCache {
    pub inner: MemoryTokenCache,
    pub sets: AtomicUsize,
    pub gets: AtomicUsize,
    pub pings: AtomicUsize,
    pub fail_set: bool,
    pub fail_ping: bool,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_set() -> Arc<Self> {
        Arc::new(Self {
            fail_set: true,
            ..Default::default()
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            fail_ping: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.pings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCache for CountingCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set {
            return Err(Error::Cache("connection reset".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.fail_ping {
            return Err(Error::Cache("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Session store whose every call fails
#[derive(Default)]
pub struct FailingSessions {
    pub loads: AtomicUsize,
}

#[async_trait]
impl SessionStore for FailingSessions {
    async fn load(&self, _headers: &HeaderMap, _name: &str) -> Result<SessionBag> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Err(Error::Session("cookie store unavailable".to_string()))
    }

    async fn save(&self, _bag: &SessionBag, _headers: &mut HeaderMap) -> Result<()> {
        Err(Error::Session("cookie store unavailable".to_string()))
    }
}
