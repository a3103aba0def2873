//! Error types for the catalog client.

use shared::ContentKind;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch candidate. Never surfaced past the fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("proxy envelope has empty contents")]
    EmptyEnvelope,

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Error returned by catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Every candidate failed and nothing was cached for the endpoint
    #[error("Failed to fetch data from {endpoint}")]
    Unavailable { endpoint: String },

    /// The category has no such endpoint
    #[error("{kind} has no {operation} endpoint")]
    Unsupported {
        operation: &'static str,
        kind: ContentKind,
    },

    /// Failed to set up the HTTP client or its dependencies
    #[error("client setup failed: {0}")]
    Setup(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
