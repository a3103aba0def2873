//! Fetch candidates.
//!
//! Each [`Provider`] knows how to reach a target URL one way: through a
//! query-string proxy, a path-appending proxy, or directly.

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use shared::config::{ApiConfig, ProxyConfig, ProxyStyle};
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

/// One way of fetching a JSON document
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Fetch `target` and parse the body as JSON
    async fn fetch(&self, target: &str) -> Result<Value, FetchError>;
}

/// Route taken by an [`HttpProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Proxy taking the percent-encoded target in its query string
    Query { prefix: String },
    /// Proxy taking the raw target appended to its path
    Path { prefix: String },
    /// The target URL itself
    Direct,
}

impl Route {
    /// URL actually requested for `target`
    pub fn request_url(&self, target: &str) -> String {
        match self {
            Route::Query { prefix } => {
                let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
                format!("{}{}", prefix, encoded)
            }
            Route::Path { prefix } => format!("{}{}", prefix, target),
            Route::Direct => target.to_string(),
        }
    }
}

impl From<&ProxyConfig> for Route {
    fn from(proxy: &ProxyConfig) -> Self {
        match proxy.style {
            ProxyStyle::Query => Route::Query {
                prefix: proxy.prefix.clone(),
            },
            ProxyStyle::Path => Route::Path {
                prefix: proxy.prefix.clone(),
            },
        }
    }
}

/// HTTP GET provider
pub struct HttpProvider {
    name: String,
    route: Route,
    client: Client,
}

impl HttpProvider {
    pub fn new(name: impl Into<String>, route: Route, client: Client) -> Self {
        Self {
            name: name.into(),
            route,
            client,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, target: &str) -> Result<Value, FetchError> {
        let url = self.route.request_url(target);
        reqwest::Url::parse(&url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!(provider = %self.name, url = %url, "Requesting");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Build the shared HTTP client
pub fn http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
}

/// Providers in the order they are tried: configured proxies, then direct
pub fn from_config(config: &ApiConfig, client: &Client) -> Vec<Box<dyn Provider>> {
    let mut providers: Vec<Box<dyn Provider>> = config
        .proxies
        .iter()
        .map(|proxy| {
            Box::new(HttpProvider::new(proxy.name.clone(), Route::from(proxy), client.clone()))
                as Box<dyn Provider>
        })
        .collect();

    if config.try_direct {
        providers.push(Box::new(HttpProvider::new("direct", Route::Direct, client.clone())));
    }

    providers
}
