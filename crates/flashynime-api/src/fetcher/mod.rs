//! Resilient JSON fetcher.
//!
//! Tries every provider in order until one returns parseable JSON, unwraps
//! proxy envelopes, records the result in the fetch cache, and serves the
//! last cached copy when every provider fails.

pub mod cache;
pub mod provider;

pub use cache::{CacheEntry, CacheStats, FetchCache};
pub use provider::{HttpProvider, Provider, Route};

use crate::error::{CatalogError, FetchError, Result};
use serde_json::Value;
use shared::config::ApiConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-candidate timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Sequential multi-provider fetcher with stale-cache fallback
pub struct ResilientFetcher {
    /// Upstream origin endpoints are joined onto
    base_url: String,
    /// Candidates, tried in order
    providers: Vec<Box<dyn Provider>>,
    /// Per-candidate timeout
    timeout: Duration,
    cache: FetchCache,
}

impl ResilientFetcher {
    pub fn new(
        base_url: impl Into<String>,
        providers: Vec<Box<dyn Provider>>,
        timeout: Duration,
        cache: FetchCache,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            providers,
            timeout,
            cache,
        }
    }

    /// Fetcher using the configured proxies followed by the direct URL
    pub fn from_config(config: &ApiConfig, cache: FetchCache) -> Result<Self> {
        let client = provider::http_client(config)
            .map_err(|e| CatalogError::Setup(format!("Failed to create HTTP client: {}", e)))?;
        let providers = provider::from_config(config, &client);

        Ok(Self::new(
            config.base_url.clone(),
            providers,
            Duration::from_secs(config.timeout_secs),
            cache,
        ))
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Full upstream URL for a logical endpoint
    pub fn target_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Fetch the JSON document behind `endpoint` (e.g. `/anime/samehadaku/home`)
    pub async fn fetch_json(&self, endpoint: &str) -> Result<Value> {
        let target = self.target_url(endpoint);

        for (idx, provider) in self.providers.iter().enumerate() {
            match self.attempt(provider.as_ref(), &target).await {
                Ok(data) => {
                    debug!(
                        endpoint = endpoint,
                        provider = provider.name(),
                        attempt = idx + 1,
                        "Fetch succeeded"
                    );
                    if let Err(e) = self.cache.set(endpoint, &data) {
                        warn!(endpoint = endpoint, error = %e, "Failed to write fetch cache");
                    }
                    return Ok(data);
                }
                Err(e) => {
                    debug!(
                        endpoint = endpoint,
                        provider = provider.name(),
                        error = %e,
                        "Candidate failed, trying next"
                    );
                }
            }
        }

        match self.cache.get(endpoint) {
            Ok(Some(entry)) => {
                warn!(
                    endpoint = endpoint,
                    cached_at = entry.timestamp,
                    "All providers failed, serving stale cached data"
                );
                Ok(entry.data)
            }
            Ok(None) => {
                warn!(endpoint = endpoint, "All providers failed and nothing is cached");
                Err(CatalogError::Unavailable {
                    endpoint: endpoint.to_string(),
                })
            }
            Err(e) => {
                warn!(endpoint = endpoint, error = %e, "All providers failed and cache is unreadable");
                Err(CatalogError::Unavailable {
                    endpoint: endpoint.to_string(),
                })
            }
        }
    }

    /// One candidate, cancelled when the timeout elapses
    async fn attempt(&self, provider: &dyn Provider, target: &str) -> std::result::Result<Value, FetchError> {
        let value = tokio::time::timeout(self.timeout, provider.fetch(target))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        unwrap_envelope(value)
    }
}

/// Strip the `{"contents": "<json>"}` wrapper some proxies add
pub fn unwrap_envelope(value: Value) -> std::result::Result<Value, FetchError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    match map.remove("contents") {
        None => Ok(Value::Object(map)),
        Some(Value::String(raw)) if raw.trim().is_empty() => Err(FetchError::EmptyEnvelope),
        Some(Value::String(raw)) => {
            debug!("Unwrapping proxy envelope");
            Ok(serde_json::from_str(&raw)?)
        }
        Some(inner @ (Value::Object(_) | Value::Array(_))) => Ok(inner),
        Some(other) => {
            map.insert("contents".to_string(), other);
            Ok(Value::Object(map))
        }
    }
}
