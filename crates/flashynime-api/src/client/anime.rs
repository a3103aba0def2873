//! Anime endpoints (`/anime/samehadaku`).

use super::{at, body, encode, genres_in, list_in, merge_settled, pagination};
use crate::error::Result;
use crate::fetcher::ResilientFetcher;
use crate::normalize::{
    normalize_anime_detail, normalize_anime_episode, normalize_batch, normalize_list,
};
use futures::future;
use rand::seq::IndexedRandom;
use serde_json::Value;
use shared::{
    Anime, AnimeDetail, BatchDetail, ContentKind, EpisodeDetail, Genre, HomeSection, HomeSections, Listing,
    ScheduleDay,
};
use std::sync::Arc;
use tracing::debug;

const ROOT: &str = "/anime/samehadaku";
const RECOMMENDED_COUNT: usize = 10;

/// Anime catalog operations
#[derive(Clone)]
pub struct AnimeCatalog {
    fetcher: Arc<ResilientFetcher>,
}

impl AnimeCatalog {
    pub(crate) fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.fetcher.fetch_json(&format!("{}{}", ROOT, path)).await
    }

    async fn listing(&self, path: &str, key: &str) -> Result<Listing> {
        let response = self.get(path).await?;
        Ok(Listing {
            items: normalize_list(ContentKind::Anime, list_in(&response, &[key])),
            pagination: pagination(&response),
        })
    }

    /// Home page: `recent`, `popular`, `movies`, `top10`, `batch`
    pub async fn home(&self) -> Result<HomeSections> {
        let response = self.get("/home").await?;
        let data = body(&response);

        let section = |name: &str, path: &[&str]| HomeSection {
            name: name.to_string(),
            items: normalize_list(ContentKind::Anime, at(data, path)),
        };

        let top10 = section("top10", &["top10", "animeList"]);
        let mut popular = section("popular", &["popular", "animeList"]);
        if popular.items.is_empty() {
            popular.items = top10.items.clone();
        }

        Ok(HomeSections {
            kind: ContentKind::Anime,
            sections: vec![
                section("recent", &["recent", "animeList"]),
                popular,
                section("movies", &["movie", "animeList"]),
                top10,
                section("batch", &["batch", "batchList"]),
            ],
        })
    }

    pub async fn ongoing(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/ongoing?page={}&order=popular", page), "animeList")
            .await
    }

    pub async fn completed(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/completed?page={}&order=latest", page), "animeList")
            .await
    }

    pub async fn movies(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/movies?page={}&order=update", page), "animeList")
            .await
    }

    pub async fn popular(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/popular?page={}", page), "animeList").await
    }

    pub async fn latest_episodes(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/recent?page={}", page), "animeList").await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Anime>> {
        let listing = self
            .listing(&format!("/search?q={}&page=1", encode(query)), "animeList")
            .await?;
        Ok(listing.items)
    }

    pub async fn detail(&self, id: &str) -> Result<AnimeDetail> {
        let response = self.get(&format!("/anime/{}", id)).await?;
        Ok(normalize_anime_detail(id, body(&response)))
    }

    pub async fn episode(&self, id: &str) -> Result<EpisodeDetail> {
        let response = self.get(&format!("/episode/{}", id)).await?;
        Ok(normalize_anime_episode(id, body(&response)))
    }

    pub async fn batch_list(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/batch?page={}", page), "batchList").await
    }

    pub async fn batch_detail(&self, id: &str) -> Result<BatchDetail> {
        let response = self.get(&format!("/batch/{}", id)).await?;
        Ok(normalize_batch(id, body(&response)))
    }

    pub async fn schedule(&self) -> Result<Vec<ScheduleDay>> {
        let response = self.get("/schedule").await?;
        let days = list_in(&response, &["days"])
            .and_then(Value::as_array)
            .map(|days| days.as_slice())
            .unwrap_or_default();

        Ok(days
            .iter()
            .map(|day| ScheduleDay {
                day: day.get("day").and_then(Value::as_str).unwrap_or_default().to_string(),
                anime_list: normalize_list(ContentKind::Anime, day.get("animeList")),
            })
            .collect())
    }

    pub async fn genres(&self) -> Result<Vec<Genre>> {
        let response = self.get("/genres").await?;
        Ok(genres_in(list_in(&response, &["genreList"]), &["title", "name"], &["genreId", "slug"]))
    }

    pub async fn by_genre(&self, genre_id: &str, page: u32) -> Result<Listing> {
        self.listing(&format!("/genres/{}?page={}", genre_id, page), "animeList")
            .await
    }

    /// Records in any of `genre_ids`, first occurrence of each id kept
    pub async fn by_genres(&self, genre_ids: &[String], page: u32) -> Result<Vec<Anime>> {
        let fetches = genre_ids.iter().map(|id| async move {
            self.by_genre(id, page).await.map(|listing| listing.items)
        });
        let results = future::join_all(fetches).await;
        debug!(genres = genre_ids.len(), "Combined genre fetch settled");
        merge_settled(&format!("{}/genres", ROOT), results)
    }

    /// First entries of the popular list
    pub async fn recommended(&self) -> Result<Vec<Anime>> {
        let mut items = self.popular(1).await?.items;
        items.truncate(RECOMMENDED_COUNT);
        Ok(items)
    }

    /// Uniformly random entry of the popular list
    pub async fn random(&self) -> Result<Option<Anime>> {
        let items = self.popular(1).await?.items;
        Ok(items.choose(&mut rand::rng()).cloned())
    }

    /// Embed URL behind a server id
    pub async fn server_embed(&self, server_id: &str) -> Result<Option<String>> {
        let response = self.get(&format!("/server/{}", server_id)).await?;
        Ok(body(&response)
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{shared_fetcher, FakeUpstream};
    use super::*;
    use crate::error::CatalogError;
    use serde_json::json;
    use shared::NO_RATING;

    fn popular_page() -> Value {
        json!({"data": {"animeList": [{"animeId": "x1", "title": "Foo", "poster": "p.jpg"}]}})
    }

    fn catalog(upstream: FakeUpstream) -> AnimeCatalog {
        AnimeCatalog::new(shared_fetcher(upstream))
    }

    #[tokio::test]
    async fn test_popular() {
        let catalog = catalog(FakeUpstream::new().route("/anime/samehadaku/popular?page=1", popular_page()));

        let listing = catalog.popular(1).await.unwrap();
        assert_eq!(listing.items.len(), 1);

        let anime = &listing.items[0];
        assert_eq!(anime.id, "x1");
        assert_eq!(anime.title, "Foo");
        assert_eq!(anime.poster.primary(), "p.jpg");
        assert_eq!(anime.rating, NO_RATING);
        assert!(anime.genres.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_names_endpoint() {
        let err = catalog(FakeUpstream::new()).ongoing(2).await.unwrap_err();
        match &err {
            CatalogError::Unavailable { endpoint } => {
                assert_eq!(endpoint, "/anime/samehadaku/ongoing?page=2&order=popular")
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.to_string().contains("/anime/samehadaku/ongoing"));
    }

    #[tokio::test]
    async fn test_home_sections() {
        let catalog = catalog(FakeUpstream::new().route(
            "/anime/samehadaku/home",
            json!({"data": {
                "recent": {"animeList": [{"animeId": "r1"}]},
                "movie": {"animeList": [{"animeId": "m1"}]},
                "top10": {"animeList": [{"animeId": "t1", "rank": 1}]},
                "batch": {"batchList": [{"batchId": "b1"}]}
            }}),
        ));

        let home = catalog.home().await.unwrap();
        assert_eq!(home.section("recent").unwrap()[0].id, "r1");
        assert_eq!(home.section("movies").unwrap()[0].id, "m1");
        assert_eq!(home.section("top10").unwrap()[0].rank, Some(1));
        assert_eq!(home.section("popular").unwrap()[0].id, "t1");
        assert_eq!(home.section("batch").unwrap()[0].id, "b1");
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let upstream = FakeUpstream::new().route(
            "/anime/samehadaku/search?q=one%20piece&page=1",
            json!({"data": {"animeList": [{"animeId": "one-piece"}]}}),
        );
        let requested = upstream.requested.clone();

        let results = catalog(upstream).search("one piece").await.unwrap();
        assert_eq!(results[0].id, "one-piece");
        assert!(requested.lock().unwrap()[0].ends_with("q=one%20piece&page=1"));
    }

    #[tokio::test]
    async fn test_by_genres_unions_and_dedupes() {
        let catalog = catalog(
            FakeUpstream::new()
                .route(
                    "/anime/samehadaku/genres/action?page=1",
                    json!({"data": {"animeList": [{"animeId": "a", "title": "from action"}, {"animeId": "b"}]}}),
                )
                .route(
                    "/anime/samehadaku/genres/comedy?page=1",
                    json!({"data": {"animeList": [{"animeId": "a", "title": "from comedy"}, {"animeId": "c"}]}}),
                ),
        );

        let genres = vec!["action".to_string(), "missing".to_string(), "comedy".to_string()];
        let items = catalog.by_genres(&genres, 1).await.unwrap();

        let ids: Vec<&str> = items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(items[0].title, "from action");
    }

    #[tokio::test]
    async fn test_recommended_and_random() {
        let list: Vec<Value> = (0..15).map(|i| json!({"animeId": format!("p{}", i)})).collect();
        let catalog = catalog(
            FakeUpstream::new().route("/anime/samehadaku/popular?page=1", json!({"data": {"animeList": list}})),
        );

        assert_eq!(catalog.recommended().await.unwrap().len(), 10);

        let picked = catalog.random().await.unwrap().unwrap();
        assert!(picked.id.starts_with('p'));
    }

    #[tokio::test]
    async fn test_random_of_empty_list() {
        let catalog = catalog(
            FakeUpstream::new().route("/anime/samehadaku/popular?page=1", json!({"data": {"animeList": []}})),
        );
        assert!(catalog.random().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schedule_and_genres() {
        let catalog = catalog(
            FakeUpstream::new()
                .route(
                    "/anime/samehadaku/schedule",
                    json!({"data": {"days": [{"day": "Monday", "animeList": [{"animeId": "mon"}]}]}}),
                )
                .route(
                    "/anime/samehadaku/genres",
                    json!({"data": {"genreList": [{"title": "Action", "genreId": "action"}]}}),
                ),
        );

        let schedule = catalog.schedule().await.unwrap();
        assert_eq!(schedule[0].day, "Monday");
        assert_eq!(schedule[0].anime_list[0].id, "mon");

        let genres = catalog.genres().await.unwrap();
        assert_eq!(genres[0].id, "action");
    }

    #[tokio::test]
    async fn test_detail_episode_and_embed() {
        let catalog = catalog(
            FakeUpstream::new()
                .route("/anime/samehadaku/anime/show", json!({"data": {"title": "Show", "episodeList": []}}))
                .route(
                    "/anime/samehadaku/episode/show-1",
                    json!({"data": {"title": "Show 1", "animeId": "show"}}),
                )
                .route("/anime/samehadaku/server/abc", json!({"data": {"url": "https://embed/abc"}})),
        );

        let detail = catalog.detail("show").await.unwrap();
        assert_eq!(detail.anime.id, "show");
        assert_eq!(detail.anime.title, "Show");

        let episode = catalog.episode("show-1").await.unwrap();
        assert_eq!(episode.anime_id, "show");

        assert_eq!(catalog.server_embed("abc").await.unwrap().as_deref(), Some("https://embed/abc"));
    }

    #[tokio::test]
    async fn test_listing_keeps_pagination() {
        let catalog = catalog(FakeUpstream::new().route(
            "/anime/samehadaku/batch?page=3",
            json!({"data": {"batchList": [{"batchId": "b"}]}, "pagination": {"currentPage": 3, "totalPages": 9}}),
        ));

        let listing = catalog.batch_list(3).await.unwrap();
        assert_eq!(listing.items[0].id, "b");
        assert_eq!(listing.pagination.unwrap().total_pages, Some(9));
    }
}
