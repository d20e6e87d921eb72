//! Signed-cookie session bags.
//!
//! A session bag is a small named key-value record carried by one signed
//! cookie. The callback handler stores the minted session identifier in it
//! under [`SESSION_ID_KEY`]; later requests read the identifier back to find
//! the cached provider token.
//!
//! The [`SessionStore`] trait is the seam: [`CookieSessionStore`] keeps the
//! whole bag in an HMAC-signed cookie, so there is no server-side session
//! state to clean up.
//!
//! ```rust,ignore
//! let store = CookieSessionStore::new(&config.session)?;
//! let mut bag = store.load(request.headers(), "authcache_github").await?;
//! bag.set_session_id("4a1c...");
//! store.save(&bag, response.headers_mut()).await?;
//! ```

mod config;
mod cookie;

pub use config::{SessionConfig, MIN_SECRET_LEN};
pub use cookie::CookieSessionStore;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde_json::{Map, Value};

use crate::error::Result;

/// Bag field holding the session identifier.
pub const SESSION_ID_KEY: &str = "sessionId";

/// Mutable, named key-value record attached to one browser.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBag {
    name: String,
    values: Map<String, Value>,
    is_new: bool,
}

impl SessionBag {
    /// Create an empty bag that no cookie has carried yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Map::new(),
            is_new: true,
        }
    }

    /// Rebuild a bag from values decoded out of a cookie.
    pub fn from_values(name: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            values,
            is_new: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the request carried no cookie for this bag.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a field only if it holds a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// The session identifier, if present and a string.
    pub fn session_id(&self) -> Option<&str> {
        self.get_str(SESSION_ID_KEY)
    }

    pub fn set_session_id(&mut self, id: impl Into<String>) {
        self.values
            .insert(SESSION_ID_KEY.to_string(), Value::String(id.into()));
    }
}

/// Loads and persists named session bags for a request/response pair.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the bag called `name` from the request headers.
    ///
    /// Returns a new, empty bag when the request carries no such cookie.
    ///
    /// # Errors
    ///
    /// Returns an error when a cookie is present but cannot be verified or
    /// decoded.
    async fn load(&self, headers: &HeaderMap, name: &str) -> Result<SessionBag>;

    /// Persist the bag by appending to the response headers.
    async fn save(&self, bag: &SessionBag, headers: &mut HeaderMap) -> Result<()>;
}
