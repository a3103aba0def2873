//! flashynime catalog client.
//!
//! Fetches the anime, donghua and manga catalog through a chain of CORS
//! proxies with a stale-cache fallback, and normalizes the three upstream
//! schemas into the canonical records from [`shared::models`].

pub mod client;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod payload;

pub use client::{AnimeCatalog, CatalogClient, CategoryOutcome, DonghuaCatalog, MangaCatalog, SearchResults};
pub use error::{CatalogError, FetchError};
pub use fetcher::{FetchCache, Provider, ResilientFetcher};
pub use normalize::{normalize, normalize_anime, normalize_donghua, normalize_manga};
pub use payload::SourcePayload;
