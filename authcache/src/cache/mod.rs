//! Token cache: key-value storage with per-key expiration
//!
//! Provider tokens are stored under the session identifier with a TTL.
//! [`RedisTokenCache`] is the production backend; [`MemoryTokenCache`]
//! keeps entries in-process for development and tests.

mod memory;
mod redis;

pub use self::memory::MemoryTokenCache;
pub use self::redis::RedisTokenCache;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Key-value store with per-key expiration
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry, for `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Fetch the live entry for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Liveness check used at registration time.
    ///
    /// Backends without a remote side are always reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
