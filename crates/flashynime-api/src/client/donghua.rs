//! Donghua endpoints (`/anime/donghua`).

use super::{body, encode, genres_in, list_in, merge_settled, pagination};
use crate::error::Result;
use crate::fetcher::ResilientFetcher;
use crate::normalize::{normalize_donghua_detail, normalize_donghua_episode, normalize_list};
use chrono::Datelike;
use futures::future;
use serde_json::Value;
use shared::{
    Anime, AnimeDetail, ContentKind, EpisodeDetail, Genre, HomeSection, HomeSections, Listing, ScheduleDay,
};
use std::sync::Arc;

const ROOT: &str = "/anime/donghua";

/// Donghua catalog operations
#[derive(Clone)]
pub struct DonghuaCatalog {
    fetcher: Arc<ResilientFetcher>,
}

impl DonghuaCatalog {
    pub(crate) fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.fetcher.fetch_json(&format!("{}{}", ROOT, path)).await
    }

    async fn listing(&self, path: &str, keys: &[&str]) -> Result<Listing> {
        let response = self.get(path).await?;
        Ok(Listing {
            items: normalize_list(ContentKind::Donghua, list_in(&response, keys)),
            pagination: pagination(&response),
        })
    }

    /// Home page: `latest`, `completed`
    pub async fn home(&self, page: u32) -> Result<HomeSections> {
        let response = self.get(&format!("/home/{}", page)).await?;
        let section = |name: &str, key: &str| HomeSection {
            name: name.to_string(),
            items: normalize_list(ContentKind::Donghua, list_in(&response, &[key])),
        };

        Ok(HomeSections {
            kind: ContentKind::Donghua,
            sections: vec![
                section("latest", "latest_release"),
                section("completed", "completed_donghua"),
            ],
        })
    }

    pub async fn ongoing(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/ongoing/{}", page), &["ongoing_donghua"]).await
    }

    pub async fn completed(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/completed/{}", page), &["completed_donghua"])
            .await
    }

    pub async fn latest(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/latest/{}", page), &["latest_donghua"]).await
    }

    pub async fn schedule(&self) -> Result<Vec<ScheduleDay>> {
        let response = self.get("/schedule").await?;
        let days = list_in(&response, &["schedule"])
            .and_then(Value::as_array)
            .map(|days| days.as_slice())
            .unwrap_or_default();

        Ok(days
            .iter()
            .map(|day| ScheduleDay {
                day: day.get("day").and_then(Value::as_str).unwrap_or_default().to_string(),
                anime_list: normalize_list(ContentKind::Donghua, day.get("donghua_list")),
            })
            .collect())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Anime>> {
        let listing = self.listing(&format!("/search/{}", encode(query)), &[]).await?;
        Ok(listing.items)
    }

    pub async fn detail(&self, id: &str) -> Result<AnimeDetail> {
        let response = self.get(&format!("/detail/{}", id)).await?;
        Ok(normalize_donghua_detail(id, body(&response)))
    }

    pub async fn episode(&self, id: &str) -> Result<EpisodeDetail> {
        let response = self.get(&format!("/episode/{}", id)).await?;
        Ok(normalize_donghua_episode(id, body(&response)))
    }

    pub async fn genres(&self) -> Result<Vec<Genre>> {
        let response = self.get("/genres").await?;
        Ok(genres_in(list_in(&response, &["genres"]), &["name", "title"], &["slug", "id"]))
    }

    pub async fn by_genre(&self, genre_id: &str, page: u32) -> Result<Listing> {
        self.listing(&format!("/genres/{}/{}", genre_id, page), &[]).await
    }

    /// Records in any of `genre_ids`, first occurrence of each id kept
    pub async fn by_genres(&self, genre_ids: &[String], page: u32) -> Result<Vec<Anime>> {
        let fetches = genre_ids.iter().map(|id| async move {
            self.by_genre(id, page).await.map(|listing| listing.items)
        });
        let results = future::join_all(fetches).await;
        merge_settled(&format!("{}/genres", ROOT), results)
    }

    /// Releases of a season year, the current year by default
    pub async fn seasons(&self, year: Option<i32>) -> Result<Vec<Anime>> {
        let year = year.unwrap_or_else(|| chrono::Local::now().year());
        let listing = self.listing(&format!("/seasons/{}", year), &[]).await?;
        Ok(listing.items)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{shared_fetcher, FakeUpstream};
    use super::*;
    use serde_json::json;

    fn catalog(upstream: FakeUpstream) -> DonghuaCatalog {
        DonghuaCatalog::new(shared_fetcher(upstream))
    }

    #[tokio::test]
    async fn test_home_folds_episodes_into_series() {
        let catalog = catalog(FakeUpstream::new().route(
            "/anime/donghua/home/1",
            json!({
                "latest_release": [{
                    "slug": "some-show-episode-42",
                    "title": "Some Show Episode 42",
                    "donghua_details": {"slug": "parent-slug", "title": "Some Show"}
                }],
                "completed_donghua": [{"slug": "done", "title": "Done"}]
            }),
        ));

        let home = catalog.home(1).await.unwrap();
        let latest = home.section("latest").unwrap();
        assert_eq!(latest[0].id, "parent-slug");
        assert_eq!(latest[0].episode, "42");
        assert!(latest[0].is_donghua);
        assert_eq!(home.section("completed").unwrap()[0].id, "done");
    }

    #[tokio::test]
    async fn test_lists() {
        let catalog = catalog(
            FakeUpstream::new()
                .route("/anime/donghua/ongoing/2", json!({"ongoing_donghua": [{"slug": "o"}]}))
                .route("/anime/donghua/completed/1", json!({"completed_donghua": [{"slug": "c"}]}))
                .route("/anime/donghua/latest/1", json!({"latest_donghua": [{"slug": "l"}]})),
        );

        assert_eq!(catalog.ongoing(2).await.unwrap().items[0].id, "o");
        assert_eq!(catalog.completed(1).await.unwrap().items[0].id, "c");
        assert_eq!(catalog.latest(1).await.unwrap().items[0].id, "l");
    }

    #[tokio::test]
    async fn test_search_in_path() {
        let catalog = catalog(
            FakeUpstream::new().route("/anime/donghua/search/soul%20land", json!({"data": [{"slug": "soul-land"}]})),
        );
        let results = catalog.search("soul land").await.unwrap();
        assert_eq!(results[0].id, "soul-land");
    }

    #[tokio::test]
    async fn test_schedule() {
        let catalog = catalog(FakeUpstream::new().route(
            "/anime/donghua/schedule",
            json!({"schedule": [{"day": "Senin", "donghua_list": [{"slug": "a"}, {"slug": "b"}]}]}),
        ));
        let schedule = catalog.schedule().await.unwrap();
        assert_eq!(schedule[0].day, "Senin");
        assert_eq!(schedule[0].anime_list.len(), 2);
    }

    #[tokio::test]
    async fn test_genres_and_seasons() {
        let catalog = catalog(
            FakeUpstream::new()
                .route("/anime/donghua/genres", json!({"data": [{"name": "Action", "slug": "action"}]}))
                .route("/anime/donghua/seasons/2023", json!({"data": [{"slug": "s1"}]}))
                .route("/anime/donghua/genres/action/1", json!({"data": [{"slug": "a1"}, {"slug": "a2"}]}))
                .route("/anime/donghua/genres/wuxia/1", json!({"data": [{"slug": "a2"}, {"slug": "w1"}]})),
        );

        let genres = catalog.genres().await.unwrap();
        assert_eq!(genres[0].name, "Action");
        assert_eq!(genres[0].id, "action");

        assert_eq!(catalog.seasons(Some(2023)).await.unwrap()[0].id, "s1");

        let combined = catalog
            .by_genres(&["action".to_string(), "wuxia".to_string()], 1)
            .await
            .unwrap();
        let ids: Vec<&str> = combined.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "w1"]);
    }

    #[tokio::test]
    async fn test_detail_and_episode() {
        let catalog = catalog(
            FakeUpstream::new()
                .route(
                    "/anime/donghua/detail/btth",
                    json!({"status": "Ongoing", "title": "BTTH", "episodes_list": [{"episode": "Ep 1", "slug": "btth-episode-1"}]}),
                )
                .route(
                    "/anime/donghua/episode/btth-episode-1",
                    json!({"episode": "BTTH Episode 1", "streaming": {"main_url": {"url": "https://embed/1"}}}),
                ),
        );

        let detail = catalog.detail("btth").await.unwrap();
        assert_eq!(detail.anime.id, "btth");
        assert_eq!(detail.anime.status, "Ongoing");
        assert_eq!(detail.episode_list[0].id, "btth-episode-1");

        let episode = catalog.episode("btth-episode-1").await.unwrap();
        assert_eq!(episode.anime_id, "btth");
        assert_eq!(episode.servers[0].server_list[0].title, "Main");
    }
}
