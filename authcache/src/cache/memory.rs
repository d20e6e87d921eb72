use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::TokenCache;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process token cache
///
/// Expired entries are dropped lazily on read and by [`purge_expired`](Self::purge_expired).
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: DashMap<String, Entry>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| Error::Cache(format!("TTL of {}s is out of range", ttl.as_secs())))?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let live = match self.entries.get(key) {
            Some(entry) => (entry.expires_at > now).then(|| entry.value.clone()),
            None => return Ok(None),
        };
        // The read guard must be dropped before removing
        if live.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(live)
    }
}
