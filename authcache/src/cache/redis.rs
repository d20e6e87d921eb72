//! Redis-backed token cache with pooled connections

use async_trait::async_trait;
use deadpool_redis::redis::{self as redis_client, AsyncCommands};
use deadpool_redis::{Config as DeadpoolConfig, Pool, Runtime};
use std::time::Duration;

use super::TokenCache;
use crate::config::RedisConfig;
use crate::error::{sanitize_url, Error, Result};

/// Token cache stored in Redis
///
/// Entries are written with `PSETEX` so millisecond TTLs are honoured.
#[derive(Clone)]
pub struct RedisTokenCache {
    pool: Pool,
}

impl RedisTokenCache {
    /// Wrap an existing connection pool
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a connection pool with retry logic
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let pool = create_pool_with_retries(config, config.max_retries).await?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::Cache(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.connection().await?;
        conn.pset_ex::<_, _, ()>(key, value, millis).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis_client::cmd("PING")
            .query_async::<String>(&mut conn)
            .await?;
        Ok(())
    }
}

/// Create a Redis connection pool with configurable retries
///
/// Uses exponential backoff strategy for retries
async fn create_pool_with_retries(config: &RedisConfig, max_retries: u32) -> Result<Pool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);
    let url = sanitize_url(&config.url);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Redis connection to {} established after {} attempt(s)",
                        url,
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Redis connection pool created for {}: max_connections={}",
                        url,
                        config.max_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to Redis at {} after {} attempts: {}",
                        url,
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay_multiplier = 2_u32.pow(attempt.saturating_sub(1));
                let delay = base_delay * delay_multiplier;

                tracing::warn!(
                    "Redis connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a Redis pool (single try)
async fn try_create_pool(config: &RedisConfig) -> Result<Pool> {
    let timeout = Some(Duration::from_secs(config.connection_timeout_secs));

    let pool = DeadpoolConfig::from_url(&config.url)
        .builder()
        .map_err(|e| Error::Cache(format!("Failed to build Redis pool: {}", e)))?
        .max_size(config.max_connections)
        .wait_timeout(timeout)
        .create_timeout(timeout)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| Error::Cache(format!("Failed to create Redis pool: {}", e)))?;

    // Test the connection
    let conn = pool
        .get()
        .await
        .map_err(|e| Error::Cache(format!("Failed to get Redis connection: {}", e)))?;
    drop(conn);

    Ok(pool)
}
