//! # authcache
//!
//! Server side of the OAuth2 authorization-code flow, with the provider
//! token cached under a session identifier held in a signed cookie.
//!
//! ## Features
//!
//! - **Callbacks**: one `GET` route per provider binding; the handler
//!   exchanges the code, caches the token and redirects
//! - **Sessions**: HMAC-signed cookies carrying a fresh UUID per login
//! - **Token cache**: Redis (pooled, with connection retries) or in-memory
//! - **Client recovery**: rebuild an authenticated HTTP client from any
//!   later request of the same browser
//! - **Post-auth hooks**: run provider calls (e.g. identity lookup) right
//!   after login
//!
//! ## Example
//!
//! ```rust,no_run
//! use authcache::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let sessions = Arc::new(CookieSessionStore::new(&config.session)?);
//!     let cache = Arc::new(MemoryTokenCache::new());
//!
//!     let registry = RegistryBuilder::new(sessions, cache)
//!         .register_all(&config.bindings)?
//!         .build()
//!         .await?;
//!
//!     Server::new(config).serve(registry.router()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod cache;
pub mod config;
pub mod error;
pub mod observability;
pub mod provider;
pub mod registry;
pub mod server;
pub mod session;

#[cfg(test)]
mod test_support;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::binding::{
        BindingConfig, IdentityLookup, IdentitySink, PostAuthProcessor, ProviderBinding,
    };
    pub use crate::cache::{MemoryTokenCache, RedisTokenCache, TokenCache};
    pub use crate::config::{BindingSettings, Config, RedisConfig};
    pub use crate::error::{Error, Result, ValidationError};
    pub use crate::observability::init_tracing;
    pub use crate::provider::{
        generate_state, AuthenticatedClient, OAuth2Client, ProviderClient, ProviderPreset,
        ProviderToken,
    };
    pub use crate::registry::{BindingRegistry, Registration, RegistryBuilder};
    pub use crate::server::Server;
    pub use crate::session::{CookieSessionStore, SessionBag, SessionConfig, SessionStore};
}
