//! Manga endpoints (`/comic`).

use super::{body, encode, genres_in, list_in, merge_settled, pagination};
use crate::error::Result;
use crate::fetcher::ResilientFetcher;
use crate::normalize::{normalize_list, normalize_manga_chapter, normalize_manga_detail};
use futures::future;
use serde_json::Value;
use shared::{Anime, AnimeDetail, ContentKind, Genre, HomeSection, HomeSections, Listing, MangaChapter, UNKNOWN_ID};
use std::sync::Arc;
use tracing::warn;

const ROOT: &str = "/comic";
const LIST_KEYS: &[&str] = &["list", "comics", "projects", "results"];

/// Manga catalog operations
#[derive(Clone)]
pub struct MangaCatalog {
    fetcher: Arc<ResilientFetcher>,
}

impl MangaCatalog {
    pub(crate) fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.fetcher.fetch_json(&format!("{}{}", ROOT, path)).await
    }

    async fn listing(&self, path: &str) -> Result<Listing> {
        let response = self.get(path).await?;
        Ok(Listing {
            items: normalize_list(ContentKind::Manga, list_in(&response, LIST_KEYS)),
            pagination: pagination(&response),
        })
    }

    /// Home page: `trending`, `latest`
    pub async fn home(&self) -> Result<HomeSections> {
        let response = self.get("/home").await?;
        let section = |name: &str, keys: &[&str]| HomeSection {
            name: name.to_string(),
            items: normalize_list(ContentKind::Manga, list_in(&response, keys)),
        };

        Ok(HomeSections {
            kind: ContentKind::Manga,
            sections: vec![
                section("trending", &["trending", "popular"]),
                section("latest", &["latest", "recent"]),
            ],
        })
    }

    /// Library ordered by `order` (`popular`, `latest`, `update`, ...)
    pub async fn list(&self, order: &str, page: u32) -> Result<Listing> {
        self.listing(&format!("/list?order={}&page={}", encode(order), page))
            .await
    }

    pub async fn projects(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/projects?page={}", page)).await
    }

    pub async fn all(&self, page: u32) -> Result<Listing> {
        self.listing(&format!("/all?page={}", page)).await
    }

    pub async fn genres(&self) -> Result<Vec<Genre>> {
        let response = self.get("/genres").await?;
        Ok(genres_in(list_in(&response, &["genres"]), &["name", "title"], &["slug", "id"]))
    }

    pub async fn by_genre(&self, genre_id: &str, page: u32) -> Result<Listing> {
        self.listing(&format!("/genres/{}?page={}", genre_id, page)).await
    }

    /// Records in any of `genre_ids`, first occurrence of each id kept
    pub async fn by_genres(&self, genre_ids: &[String], page: u32) -> Result<Vec<Anime>> {
        let fetches = genre_ids.iter().map(|id| async move {
            self.by_genre(id, page).await.map(|listing| listing.items)
        });
        let results = future::join_all(fetches).await;
        merge_settled(&format!("{}/genres", ROOT), results)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Anime>> {
        let listing = self.listing(&format!("/search?q={}", encode(query))).await?;
        Ok(listing.items)
    }

    pub async fn detail(&self, id: &str) -> Result<AnimeDetail> {
        let response = self.get(&format!("/detail/{}", id)).await?;
        Ok(normalize_manga_detail(id, body(&response)))
    }

    /// Chapter images with navigation. The owning manga's chapter list is
    /// fetched for prev/next; if that fetch fails the chapter is still
    /// returned without derived navigation.
    pub async fn chapter(&self, id: &str) -> Result<MangaChapter> {
        let response = self.get(&format!("/chapter/{}", id)).await?;
        let raw = body(&response);

        let manga_id = raw
            .get("comicSlug")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|slug| !slug.is_empty() && *slug != UNKNOWN_ID);

        let chapters = match manga_id {
            Some(manga_id) => match self.detail(manga_id).await {
                Ok(detail) => detail.episode_list,
                Err(e) => {
                    warn!(chapter = id, manga = manga_id, error = %e, "No chapter list for navigation");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Ok(normalize_manga_chapter(id, raw, &chapters))
    }
}
