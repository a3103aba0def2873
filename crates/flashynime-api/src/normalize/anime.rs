//! Anime source (`/anime/samehadaku`).

use super::{first_text, genre_names, poster_or_default, rating_label, slug_from_href, strip_label_marker, synopsis, text_or_empty};
use crate::payload::{
    parse_object, AnimeDetailPayload, AnimeEpisodePayload, AnimeSourcePayload, BatchPayload, RawDownloads,
    RawServerBlock,
};
use serde_json::Value;
use shared::{
    Anime, AnimeDetail, BatchDetail, BatchLink, ContentKind, DownloadLink, EpisodeDetail, EpisodeRef,
    QualityLinks, ServerQuality, VideoServer, UNKNOWN_ID,
};

/// Normalize one raw anime entry
pub fn normalize_anime(raw: &Value) -> Anime {
    super::normalize_value(ContentKind::Anime, raw)
}

pub(crate) fn from_payload(p: AnimeSourcePayload) -> Anime {
    let id = first_text(&[&p.anime_id, &p.episode_id, &p.batch_id, &p.id, &p.slug])
        .map(str::to_string)
        .or_else(|| p.href.as_deref().and_then(slug_from_href))
        .unwrap_or_else(|| UNKNOWN_ID.to_string());

    // `episodes` is checked first, matching the upstream listing shape
    let episode = first_text(&[&p.episodes, &p.episode, &p.current_episode])
        .map(strip_label_marker)
        .unwrap_or_default();

    Anime {
        id,
        title: first_text(&[&p.title]).unwrap_or("Unknown").to_string(),
        poster: poster_or_default(&[&p.poster]),
        status: text_or_empty(&[&p.status]),
        rating: rating_label(p.score.as_ref()),
        genres: genre_names(&p.genre_list),
        episode,
        kind: text_or_empty(&[&p.kind]),
        release_day: text_or_empty(&[&p.released_on, &p.release_date]),
        last_update: text_or_empty(&[&p.released_on]),
        is_donghua: false,
        is_manga: false,
        rank: first_text(&[&p.rank]).and_then(|r| r.parse().ok()),
    }
}

/// Normalize an anime detail page
pub fn normalize_anime_detail(id: &str, raw: &Value) -> AnimeDetail {
    let Some(p) = parse_object::<AnimeDetailPayload>(raw) else {
        return AnimeDetail::from_summary(with_requested_id(Anime::placeholder(ContentKind::Anime), id));
    };

    let japanese_title = first_text(&[&p.japanese]).map(str::to_string);
    let english_title = first_text(&[&p.english]).map(str::to_string);
    let producer = first_text(&[&p.producers]).map(str::to_string);
    let studio = first_text(&[&p.studios]).map(str::to_string);
    let duration = first_text(&[&p.duration]).map(str::to_string);
    let total_episodes = first_text(&[&p.summary.episodes]).map(str::to_string);
    let release_date = first_text(&[&p.aired]).map(str::to_string);
    let score = p.summary.score.is_some().then(|| rating_label(p.summary.score.as_ref()));

    let batch_link = p.batch_list.first().and_then(|batch| {
        let link = batch.href.clone().unwrap_or_default();
        let id = first_text(&[&batch.batch_id])
            .map(str::to_string)
            .or_else(|| slug_from_href(&link))?;
        Some(BatchLink {
            id,
            link,
            text: text_or_empty(&[&batch.title]),
        })
    });

    let episode_list = p
        .episode_list
        .iter()
        .filter_map(|ep| {
            let id = first_text(&[&ep.episode_id])?;
            Some(EpisodeRef {
                title: format!("Episode {}", text_or_empty(&[&ep.title])),
                id: id.to_string(),
            })
        })
        .collect();

    let recommendations = p.recommended_anime_list.iter().map(normalize_anime).collect();

    let anime = with_requested_id(from_payload(p.summary), id);
    AnimeDetail {
        synopsis: synopsis(p.synopsis),
        episode_list,
        batch_link,
        japanese_title,
        english_title,
        score,
        studio,
        producer,
        author: None,
        duration,
        total_episodes,
        release_date,
        recommendations,
        anime,
    }
}

/// Normalize an anime episode page
pub fn normalize_anime_episode(id: &str, raw: &Value) -> EpisodeDetail {
    let p = parse_object::<AnimeEpisodePayload>(raw).unwrap_or_default();

    let prev_episode = p
        .has_prev_episode
        .then(|| p.prev_episode.as_ref().and_then(|e| first_text(&[&e.episode_id])))
        .flatten()
        .map(str::to_string);
    let next_episode = p
        .has_next_episode
        .then(|| p.next_episode.as_ref().and_then(|e| first_text(&[&e.episode_id])))
        .flatten()
        .map(str::to_string);

    EpisodeDetail {
        id: id.to_string(),
        title: text_or_empty(&[&p.title]),
        anime_id: first_text(&[&p.anime_id]).unwrap_or(UNKNOWN_ID).to_string(),
        stream_link: text_or_empty(&[&p.default_streaming_url]),
        servers: p.server.map(parse_servers).unwrap_or_default(),
        download_links: p.download_url.map(parse_downloads).unwrap_or_default(),
        prev_episode,
        next_episode,
    }
}

/// Normalize a batch download page
pub fn normalize_batch(id: &str, raw: &Value) -> BatchDetail {
    let p = parse_object::<BatchPayload>(raw).unwrap_or_default();
    BatchDetail {
        id: id.to_string(),
        title: first_text(&[&p.title]).unwrap_or("Unknown").to_string(),
        poster: poster_or_default(&[&p.poster]),
        status: text_or_empty(&[&p.status]),
        download_links: p.download_url.map(parse_downloads).unwrap_or_default(),
    }
}

fn with_requested_id(mut anime: Anime, id: &str) -> Anime {
    if anime.is_unknown() && !id.is_empty() {
        anime.id = id.to_string();
    }
    anime
}

fn parse_servers(block: RawServerBlock) -> Vec<ServerQuality> {
    block
        .qualities
        .into_iter()
        .filter(|q| !q.server_list.is_empty())
        .map(|q| ServerQuality {
            title: text_or_empty(&[&q.title]),
            server_list: q
                .server_list
                .into_iter()
                .map(|s| VideoServer {
                    title: text_or_empty(&[&s.title]),
                    server_id: text_or_empty(&[&s.server_id]),
                    href: text_or_empty(&[&s.href]),
                })
                .collect(),
        })
        .collect()
}

/// Flatten formats → qualities → urls into `"{format} - {quality}"` groups
pub(crate) fn parse_downloads(downloads: RawDownloads) -> Vec<QualityLinks> {
    let mut groups = Vec::new();
    for format in downloads.formats {
        let format_title = text_or_empty(&[&format.title]);
        for quality in format.qualities {
            let links: Vec<DownloadLink> = quality
                .urls
                .iter()
                .filter_map(|u| {
                    Some(DownloadLink {
                        title: text_or_empty(&[&u.title]),
                        link: first_text(&[&u.url])?.to_string(),
                    })
                })
                .collect();
            if links.is_empty() {
                continue;
            }
            groups.push(QualityLinks {
                quality: format!("{} - {}", format_title, text_or_empty(&[&quality.title])),
                links,
            });
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::NO_RATING;

    #[test]
    fn test_id_from_anime_id() {
        let anime = normalize_anime(&json!({"animeId": "abc", "episodeId": "ignored"}));
        assert_eq!(anime.id, "abc");
        assert!(!anime.is_donghua && !anime.is_manga);
    }

    #[test]
    fn test_id_fallback_order() {
        assert_eq!(normalize_anime(&json!({"episodeId": "ep-1", "slug": "s"})).id, "ep-1");
        assert_eq!(normalize_anime(&json!({"batchId": "b-1", "id": "i"})).id, "b-1");
        assert_eq!(normalize_anime(&json!({"animeId": " ", "slug": "s"})).id, "s");
    }

    #[test]
    fn test_id_from_href() {
        let anime = normalize_anime(&json!({"href": "https://site/anime/my-slug/", "title": "T"}));
        assert_eq!(anime.id, "my-slug");
    }

    #[test]
    fn test_no_id_fields_is_unknown() {
        let anime = normalize_anime(&json!({"title": "Orphan"}));
        assert_eq!(anime.id, UNKNOWN_ID);
        assert_eq!(anime.title, "Orphan");
    }

    #[test]
    fn test_full_record() {
        let anime = normalize_anime(&json!({
            "animeId": "x",
            "title": "Show",
            "poster": "p.jpg",
            "status": "Ongoing",
            "score": {"value": "8.5"},
            "genreList": [{"title": "Action"}, {"name": "Drama"}, "Comedy"],
            "episodes": "Ep 12",
            "type": "TV",
            "releasedOn": "Monday",
            "rank": "3",
        }));

        assert_eq!(anime.rating, "8.5");
        assert_eq!(anime.genres, vec!["Action", "Drama", "Comedy"]);
        assert_eq!(anime.episode, "12");
        assert_eq!(anime.kind, "TV");
        assert_eq!(anime.release_day, "Monday");
        assert_eq!(anime.last_update, "Monday");
        assert_eq!(anime.rank, Some(3));
    }

    #[test]
    fn test_episode_label_order() {
        let anime = normalize_anime(&json!({"animeId": "a", "episodes": "24", "episode": "Ep 3", "current_episode": "5"}));
        assert_eq!(anime.episode, "24");

        let anime = normalize_anime(&json!({"animeId": "a", "episode": "Ep 3", "current_episode": "5"}));
        assert_eq!(anime.episode, "3");

        let anime = normalize_anime(&json!({"animeId": "a", "current_episode": "Episode 5"}));
        assert_eq!(anime.episode, "5");
    }

    #[test]
    fn test_missing_score_and_genres() {
        let anime = normalize_anime(&json!({"animeId": "x1", "title": "Foo", "poster": "p.jpg"}));
        assert_eq!(anime.rating, NO_RATING);
        assert!(anime.genres.is_empty());
        assert_eq!(anime.poster.primary(), "p.jpg");
    }

    #[test]
    fn test_detail() {
        let detail = normalize_anime_detail(
            "show",
            &json!({
                "title": "Show",
                "japanese": "ショー",
                "english": "Show EN",
                "score": {"value": "7.9", "users": "1,000"},
                "producers": "A, B",
                "studios": "Studio",
                "synopsis": {"paragraphs": ["One.", "Two."]},
                "duration": "24 min",
                "episodes": 12,
                "aired": "Jan 2024",
                "batchList": [{"title": "Batch", "batchId": "show-batch", "href": "/batch/show-batch"}],
                "episodeList": [{"title": 2, "episodeId": "show-2"}, {"title": 1, "episodeId": "show-1"}],
                "recommendedAnimeList": [{"animeId": "other"}],
            }),
        );

        assert_eq!(detail.anime.id, "show");
        assert_eq!(detail.anime.rating, "7.9");
        assert_eq!(detail.score.as_deref(), Some("7.9"));
        assert_eq!(detail.japanese_title.as_deref(), Some("ショー"));
        assert_eq!(detail.total_episodes.as_deref(), Some("12"));
        assert_eq!(detail.synopsis.to_text(), "One.\n\nTwo.");
        assert_eq!(detail.batch_link.unwrap().id, "show-batch");
        assert_eq!(detail.episode_list[0].title, "Episode 2");
        assert_eq!(detail.episode_list[1].id, "show-1");
        assert_eq!(detail.recommendations[0].id, "other");
    }

    #[test]
    fn test_detail_of_garbage_keeps_requested_id() {
        let detail = normalize_anime_detail("wanted", &json!("nope"));
        assert_eq!(detail.anime.id, "wanted");
        assert!(detail.episode_list.is_empty());
    }

    #[test]
    fn test_episode() {
        let episode = normalize_anime_episode(
            "show-2",
            &json!({
                "title": "Show Episode 2",
                "animeId": "show",
                "defaultStreamingUrl": "https://stream/2",
                "server": {"qualities": [
                    {"title": "360p", "serverList": []},
                    {"title": "720p", "serverList": [{"title": "Mirror", "serverId": "abc", "href": "/server/abc"}]}
                ]},
                "downloadUrl": {"formats": [{"title": "MKV", "qualities": [
                    {"title": "720p", "urls": [{"title": "GDrive", "url": "https://dl/1"}, {"title": "Dead"}]},
                    {"title": "1080p", "urls": []}
                ]}]},
                "hasPrevEpisode": true,
                "prevEpisode": {"episodeId": "show-1"},
                "hasNextEpisode": false,
                "nextEpisode": {"episodeId": "show-3"},
            }),
        );

        assert_eq!(episode.anime_id, "show");
        assert_eq!(episode.stream_link, "https://stream/2");
        assert_eq!(episode.servers.len(), 1);
        assert_eq!(episode.servers[0].server_list[0].server_id, "abc");
        assert_eq!(episode.download_links.len(), 1);
        assert_eq!(episode.download_links[0].quality, "MKV - 720p");
        assert_eq!(episode.download_links[0].links.len(), 1);
        assert_eq!(episode.prev_episode.as_deref(), Some("show-1"));
        assert_eq!(episode.next_episode, None);
    }

    #[test]
    fn test_batch() {
        let batch = normalize_batch(
            "b1",
            &json!({"title": "Batch", "poster": ["a.jpg", "b.jpg"], "downloadUrl": {"formats": []}}),
        );
        assert_eq!(batch.id, "b1");
        assert_eq!(batch.poster.primary(), "a.jpg");
        assert!(batch.download_links.is_empty());
    }
}
