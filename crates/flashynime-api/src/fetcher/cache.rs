//! Last-known-good response cache.
//!
//! Every successful fetch is stored under its endpoint. Entries are only
//! read back when every live candidate has failed, and are never expired.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Stored response snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unwrapped upstream JSON
    pub data: Value,
    /// Write time, epoch milliseconds
    pub timestamp: i64,
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
}

/// Endpoint-keyed cache over a key-value store
#[derive(Clone)]
pub struct FetchCache {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    enabled: bool,
}

impl FetchCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>, enabled: bool) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            enabled,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(Arc::new(shared::MemoryStore::new()), "", false)
    }

    pub fn key(&self, endpoint: &str) -> String {
        format!("{}{}", self.key_prefix, endpoint)
    }

    /// Read the entry stored for an endpoint
    pub fn get(&self, endpoint: &str) -> Result<Option<CacheEntry>> {
        if !self.enabled {
            return Ok(None);
        }

        let key = self.key(endpoint);
        let Some(raw) = self.store.get(&key)? else {
            debug!(endpoint = endpoint, "Cache miss");
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse cache entry: {}", key))?;

        debug!(endpoint = endpoint, timestamp = entry.timestamp, "Cache hit");
        Ok(Some(entry))
    }

    /// Store a fresh snapshot for an endpoint, replacing the previous one
    pub fn set(&self, endpoint: &str, data: &Value) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = CacheEntry {
            data: data.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let raw = serde_json::to_string(&entry).context("Failed to serialize cache entry")?;

        self.store.set(&self.key(endpoint), &raw)?;
        debug!(endpoint = endpoint, "Cache stored");
        Ok(())
    }

    /// Remove every entry under this cache's prefix
    pub fn clear(&self) -> Result<usize> {
        let keys = self.store.keys(&self.key_prefix)?;
        for key in &keys {
            self.store.remove(key)?;
        }
        info!(removed = keys.len(), "Cache cleared");
        Ok(keys.len())
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for key in self.store.keys(&self.key_prefix)? {
            if let Some(raw) = self.store.get(&key)? {
                stats.total_entries += 1;
                stats.total_size_bytes += raw.len() as u64;
            }
        }
        Ok(stats)
    }
}
