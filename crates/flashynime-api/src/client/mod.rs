//! Typed catalog operations.
//!
//! One operation per upstream endpoint, grouped by category. Every
//! operation fetches through the shared [`ResilientFetcher`] and returns
//! canonical records.

pub mod anime;
pub mod donghua;
pub mod manga;

pub use anime::AnimeCatalog;
pub use donghua::DonghuaCatalog;
pub use manga::MangaCatalog;

use crate::error::{CatalogError, Result};
use crate::fetcher::{FetchCache, ResilientFetcher};
use anyhow::Context;
use futures::future;
use serde::Serialize;
use serde_json::Value;
use shared::{Anime, AnimeDetail, Config, ContentKind, Genre, Pagination, ScheduleDay};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use url::form_urlencoded;

/// Entry point for every catalog operation
#[derive(Clone)]
pub struct CatalogClient {
    fetcher: Arc<ResilientFetcher>,
}

impl CatalogClient {
    pub fn new(fetcher: ResilientFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    /// Client with the configured proxies and fetch cache
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = shared::storage::open(config.cache.backend, config.cache_path())
            .context("Failed to open fetch cache")?;
        let cache = FetchCache::new(store, config.cache.key_prefix.clone(), config.cache.enabled);
        let fetcher = ResilientFetcher::from_config(&config.api, cache)?;

        info!(
            base_url = %config.api.base_url,
            proxies = config.api.proxies.len(),
            cache = config.cache.enabled,
            "Catalog client ready"
        );
        Ok(Self::new(fetcher))
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    pub fn anime(&self) -> AnimeCatalog {
        AnimeCatalog::new(self.fetcher.clone())
    }

    pub fn donghua(&self) -> DonghuaCatalog {
        DonghuaCatalog::new(self.fetcher.clone())
    }

    pub fn manga(&self) -> MangaCatalog {
        MangaCatalog::new(self.fetcher.clone())
    }

    /// Search one category
    pub async fn search(&self, kind: ContentKind, query: &str) -> Result<Vec<Anime>> {
        match kind {
            ContentKind::Anime => self.anime().search(query).await,
            ContentKind::Donghua => self.donghua().search(query).await,
            ContentKind::Manga => self.manga().search(query).await,
        }
    }

    /// Search all three categories concurrently
    pub async fn search_everywhere(&self, query: &str) -> SearchResults {
        let (anime, donghua, manga) = (self.anime(), self.donghua(), self.manga());
        let (anime, donghua, manga) =
            future::join3(anime.search(query), donghua.search(query), manga.search(query)).await;

        SearchResults {
            anime: CategoryOutcome::from(anime),
            donghua: CategoryOutcome::from(donghua),
            manga: CategoryOutcome::from(manga),
        }
    }

    /// Detail page of one record
    pub async fn detail(&self, kind: ContentKind, id: &str) -> Result<AnimeDetail> {
        match kind {
            ContentKind::Anime => self.anime().detail(id).await,
            ContentKind::Donghua => self.donghua().detail(id).await,
            ContentKind::Manga => self.manga().detail(id).await,
        }
    }

    pub async fn genres(&self, kind: ContentKind) -> Result<Vec<Genre>> {
        match kind {
            ContentKind::Anime => self.anime().genres().await,
            ContentKind::Donghua => self.donghua().genres().await,
            ContentKind::Manga => self.manga().genres().await,
        }
    }

    pub async fn schedule(&self, kind: ContentKind) -> Result<Vec<ScheduleDay>> {
        match kind {
            ContentKind::Anime => self.anime().schedule().await,
            ContentKind::Donghua => self.donghua().schedule().await,
            ContentKind::Manga => Err(CatalogError::Unsupported {
                operation: "schedule",
                kind,
            }),
        }
    }
}

/// Outcome of one category in a cross-category search
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum CategoryOutcome {
    Ok { items: Vec<Anime> },
    Failed { error: String },
}

impl CategoryOutcome {
    pub fn items(&self) -> &[Anime] {
        match self {
            CategoryOutcome::Ok { items } => items,
            CategoryOutcome::Failed { .. } => &[],
        }
    }
}

impl From<Result<Vec<Anime>>> for CategoryOutcome {
    fn from(result: Result<Vec<Anime>>) -> Self {
        match result {
            Ok(items) => CategoryOutcome::Ok { items },
            Err(e) => CategoryOutcome::Failed { error: e.to_string() },
        }
    }
}

/// Results of [`CatalogClient::search_everywhere`]
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub anime: CategoryOutcome,
    pub donghua: CategoryOutcome,
    pub manga: CategoryOutcome,
}

/// Percent-encode a query for use in a query string or path segment
pub(crate) fn encode(query: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    encoded.replace('+', "%20")
}

/// `data` member of a response, or the response itself
pub(crate) fn body(response: &Value) -> &Value {
    match response.get("data") {
        Some(data) if data.is_object() || data.is_array() => data,
        _ => response,
    }
}

/// Follow `path` through nested objects
pub(crate) fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// First array found under any of `keys`, looked up in the body then the
/// response root; a body that is itself an array wins.
pub(crate) fn list_in<'a>(response: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let data = body(response);
    if data.is_array() {
        return Some(data);
    }
    keys.iter()
        .filter_map(|key| data.get(*key).or_else(|| response.get(*key)))
        .find(|v| v.is_array())
}

pub(crate) fn pagination(response: &Value) -> Option<Pagination> {
    response
        .get("pagination")
        .or_else(|| body(response).get("pagination"))
        .filter(|p| p.is_object())
        .and_then(|p| serde_json::from_value(p.clone()).ok())
}

/// Genre entries; `name_keys`/`id_keys` are tried in order
pub(crate) fn genres_in(list: Option<&Value>, name_keys: &[&str], id_keys: &[&str]) -> Vec<Genre> {
    let Some(items) = list.and_then(Value::as_array) else {
        return Vec::new();
    };

    let pick = |item: &Value, keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|key| item.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    };

    items
        .iter()
        .filter_map(|item| {
            Some(Genre {
                name: pick(item, name_keys)?,
                id: pick(item, id_keys)?,
            })
        })
        .collect()
}

/// Keep the first record of each id
pub fn dedupe_by_id(items: impl IntoIterator<Item = Anime>) -> Vec<Anime> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|anime| seen.insert(anime.id.clone()))
        .collect()
}

/// Union of settled per-genre fetches. Failures are skipped; the union is
/// an error only when every fetch failed.
pub(crate) fn merge_settled(endpoint: &str, results: Vec<Result<Vec<Anime>>>) -> Result<Vec<Anime>> {
    let total = results.len();
    let mut merged = Vec::new();
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(items) => merged.extend(items),
            Err(e) => {
                warn!(endpoint = endpoint, error = %e, "Genre fetch failed, skipping");
                failures.push(e);
            }
        }
    }

    if total > 0 && failures.len() == total {
        if let Some(e) = failures.pop() {
            return Err(e);
        }
    }
    Ok(dedupe_by_id(merged))
}


#[cfg(test)]
mod tests {
    use super::testing::{client, FakeUpstream};
    use super::*;
    use serde_json::json;

    fn anime(id: &str) -> Anime {
        let mut anime = Anime::placeholder(ContentKind::Anime);
        anime.id = id.to_string();
        anime
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("one piece"), "one%20piece");
        assert_eq!(encode("a+b&c"), "a%2Bb%26c");
        assert_eq!(encode("  spaced "), "spaced");
    }

    #[test]
    fn test_list_in() {
        let nested = json!({"data": {"animeList": [1]}});
        assert_eq!(list_in(&nested, &["animeList"]), Some(&json!([1])));

        let top_level = json!({"latest_release": [2], "data": null});
        assert_eq!(list_in(&top_level, &["latest_release"]), Some(&json!([2])));

        let bare = json!({"data": [3]});
        assert_eq!(list_in(&bare, &["anything"]), Some(&json!([3])));

        assert_eq!(list_in(&json!({"data": {}}), &["animeList"]), None);
    }

    #[test]
    fn test_pagination() {
        let response = json!({"pagination": {"currentPage": 2, "hasNextPage": true, "nextPage": 3}});
        let page = pagination(&response).unwrap();
        assert_eq!(page.current_page, Some(2));
        assert!(page.has_next_page);
        assert!(pagination(&json!({})).is_none());
    }

    #[test]
    fn test_genres_in() {
        let list = json!([
            {"title": "Action", "genreId": "action"},
            {"name": "Drama", "slug": "drama"},
            {"title": "No id"}
        ]);
        let genres = genres_in(Some(&list), &["title", "name"], &["genreId", "slug"]);
        assert_eq!(
            genres,
            vec![
                Genre {
                    id: "action".to_string(),
                    name: "Action".to_string()
                },
                Genre {
                    id: "drama".to_string(),
                    name: "Drama".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut first = anime("a");
        first.title = "first".to_string();
        let mut second = anime("a");
        second.title = "second".to_string();

        let deduped = dedupe_by_id(vec![first, anime("b"), second]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "first");
    }

    #[test]
    fn test_merge_settled() {
        let unavailable = || CatalogError::Unavailable {
            endpoint: "/x".to_string(),
        };

        let merged = merge_settled("/g", vec![Ok(vec![anime("a"), anime("b")]), Err(unavailable()), Ok(vec![anime("b"), anime("c")])]).unwrap();
        let ids: Vec<&str> = merged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(merge_settled("/g", vec![Err(unavailable()), Err(unavailable())]).is_err());
        assert!(merge_settled("/g", Vec::new()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_everywhere_reports_each_category() {
        let upstream = FakeUpstream::new()
            .route(
                "/anime/samehadaku/search?q=naruto&page=1",
                json!({"data": {"animeList": [{"animeId": "naruto"}]}}),
            )
            .route("/comic/search?q=naruto", json!({"data": [{"slug": "naruto-manga"}]}));

        let results = client(upstream).search_everywhere("naruto").await;

        assert_eq!(results.anime.items()[0].id, "naruto");
        assert!(matches!(results.donghua, CategoryOutcome::Failed { .. }));
        assert_eq!(results.manga.items()[0].id, "naruto-manga");
        assert!(results.manga.items()[0].is_manga);
    }

    #[tokio::test]
    async fn test_manga_has_no_schedule() {
        let result = client(FakeUpstream::new()).schedule(ContentKind::Manga).await;
        assert!(matches!(result, Err(CatalogError::Unsupported { .. })));
    }
}
