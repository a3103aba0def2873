//! Donghua source (`/anime/donghua`).
//!
//! Latest-release lists mix series and episodes. An entry is treated as an
//! episode when its slug contains `-episode-` or it carries a nested
//! `donghua_details` parent; such entries are folded into their parent
//! series so that the canonical id always names a series.

use super::{first_text, genre_names, poster_or_default, rating_label, strip_label_marker, synopsis, text_or_empty};
use crate::payload::{parse_object, DonghuaDetailPayload, DonghuaEpisodePayload, DonghuaSourcePayload, RawStream};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use shared::{
    Anime, AnimeDetail, ContentKind, DownloadLink, EpisodeDetail, EpisodeRef, QualityLinks, ServerQuality,
    VideoServer, UNKNOWN_ID,
};

const EPISODE_MARKER: &str = "-episode-";
const DEFAULT_TYPE: &str = "Donghua";
const DOWNLOAD_KEY_PREFIX: &str = "download_url_";

static EPISODE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\bEpisode\s+\d+.*$").expect("valid episode suffix pattern"));

/// Normalize one raw donghua entry
pub fn normalize_donghua(raw: &Value) -> Anime {
    super::normalize_value(ContentKind::Donghua, raw)
}

/// Series slug of an episode slug (`btth-episode-42` → `btth`)
pub fn series_slug(episode_slug: &str) -> Option<&str> {
    episode_slug
        .split_once(EPISODE_MARKER)
        .map(|(series, _)| series)
        .filter(|s| !s.is_empty())
}

/// Episode number encoded in an episode slug
fn episode_number(episode_slug: &str) -> Option<&str> {
    let (_, rest) = episode_slug.split_once(EPISODE_MARKER)?;
    rest.split('-').next().filter(|n| !n.is_empty())
}

fn strip_episode_suffix(title: &str) -> String {
    EPISODE_SUFFIX.replace(title, "").trim().to_string()
}

pub(crate) fn from_payload(p: DonghuaSourcePayload) -> Anime {
    let own_id = first_text(&[&p.slug, &p.id]).map(str::to_string);
    let is_episode = p.donghua_details.is_some() || own_id.as_deref().is_some_and(|id| id.contains(EPISODE_MARKER));

    let release_day = text_or_empty(&[&p.released, &p.released_on]);
    let last_update = text_or_empty(&[&p.updated_on]);

    if !is_episode {
        return Anime {
            id: own_id.unwrap_or_else(|| UNKNOWN_ID.to_string()),
            title: first_text(&[&p.title]).unwrap_or("Unknown").to_string(),
            poster: poster_or_default(&[&p.poster]),
            status: text_or_empty(&[&p.status]),
            rating: rating_label(p.rating.as_ref()),
            genres: genre_names(&p.genres),
            episode: first_text(&[&p.current_episode, &p.episode])
                .map(strip_label_marker)
                .unwrap_or_default(),
            kind: first_text(&[&p.kind]).unwrap_or(DEFAULT_TYPE).to_string(),
            release_day,
            last_update,
            is_donghua: true,
            is_manga: false,
            rank: None,
        };
    }

    let parent = p.donghua_details.map(|parent| *parent).unwrap_or_default();

    let id = first_text(&[&parent.slug, &parent.id])
        .or_else(|| own_id.as_deref().and_then(series_slug))
        .or(own_id.as_deref())
        .unwrap_or(UNKNOWN_ID)
        .to_string();

    let title = first_text(&[&parent.title])
        .map(str::to_string)
        .or_else(|| first_text(&[&p.title]).map(strip_episode_suffix))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let episode = first_text(&[&p.current_episode, &p.episode])
        .map(strip_label_marker)
        .or_else(|| own_id.as_deref().and_then(episode_number).map(str::to_string))
        .unwrap_or_default();

    let genres = if parent.genres.is_empty() {
        genre_names(&p.genres)
    } else {
        genre_names(&parent.genres)
    };

    Anime {
        id,
        title,
        poster: poster_or_default(&[&parent.poster, &p.poster]),
        status: text_or_empty(&[&parent.status, &p.status]),
        rating: rating_label(parent.rating.as_ref().or(p.rating.as_ref())),
        genres,
        episode,
        kind: first_text(&[&parent.kind, &p.kind]).unwrap_or(DEFAULT_TYPE).to_string(),
        release_day,
        last_update,
        is_donghua: true,
        is_manga: false,
        rank: None,
    }
}

/// Normalize a donghua detail page
pub fn normalize_donghua_detail(id: &str, raw: &Value) -> AnimeDetail {
    let Some(p) = parse_object::<DonghuaDetailPayload>(raw) else {
        let mut anime = Anime::placeholder(ContentKind::Donghua);
        anime.id = id.to_string();
        return AnimeDetail::from_summary(anime);
    };

    let episode_list = p
        .episodes_list
        .iter()
        .filter_map(|ep| {
            let slug = first_text(&[&ep.slug])?;
            Some(EpisodeRef {
                title: first_text(&[&ep.episode]).unwrap_or(slug).to_string(),
                id: slug.to_string(),
            })
        })
        .collect();

    let score = p.summary.rating.is_some().then(|| rating_label(p.summary.rating.as_ref()));
    let release_date = first_text(&[&p.summary.released]).map(str::to_string);
    let english_title = first_text(&[&p.summary.title]).map(str::to_string);

    let mut anime = from_payload(p.summary);
    if anime.is_unknown() && !id.is_empty() {
        anime.id = id.to_string();
    }

    AnimeDetail {
        anime,
        synopsis: synopsis(p.synopsis),
        episode_list,
        batch_link: None,
        japanese_title: first_text(&[&p.alter_title]).map(str::to_string),
        english_title,
        score,
        studio: first_text(&[&p.studio]).map(str::to_string),
        producer: first_text(&[&p.network]).map(str::to_string),
        author: None,
        duration: first_text(&[&p.duration]).map(str::to_string),
        total_episodes: first_text(&[&p.episodes_count]).map(str::to_string),
        release_date,
        recommendations: Vec::new(),
    }
}

/// Normalize a donghua episode page
pub fn normalize_donghua_episode(id: &str, raw: &Value) -> EpisodeDetail {
    let p = parse_object::<DonghuaEpisodePayload>(raw).unwrap_or_default();

    // A parent slug equal to the episode id, or itself an episode slug, is not trusted
    let anime_id = p
        .donghua_details
        .as_ref()
        .and_then(|d| first_text(&[&d.slug]))
        .filter(|slug| *slug != id && !slug.contains("episode-"))
        .or_else(|| series_slug(id))
        .unwrap_or(id)
        .to_string();

    let navigation = p.navigation.unwrap_or_default();
    let prev_episode = navigation
        .previous_episode
        .as_ref()
        .and_then(|e| first_text(&[&e.slug]))
        .map(str::to_string);
    let next_episode = navigation
        .next_episode
        .as_ref()
        .and_then(|e| first_text(&[&e.slug]))
        .map(str::to_string);

    let streaming = p.streaming.unwrap_or_default();
    let stream_link = streaming
        .main_url
        .as_ref()
        .and_then(|m| first_text(&[&m.url]))
        .unwrap_or_default()
        .to_string();

    EpisodeDetail {
        id: id.to_string(),
        title: first_text(&[&p.episode]).unwrap_or(id).to_string(),
        anime_id,
        stream_link,
        servers: streaming_servers(streaming.main_url, streaming.servers),
        download_links: p.download_url.map(download_groups).unwrap_or_default(),
        prev_episode,
        next_episode,
    }
}

/// Main stream plus mirrors as a single `Streaming` group
fn streaming_servers(main: Option<RawStream>, servers: Vec<RawStream>) -> Vec<ServerQuality> {
    let mut server_list: Vec<VideoServer> = Vec::new();

    if let Some(url) = main.as_ref().and_then(|m| first_text(&[&m.url])) {
        server_list.push(VideoServer {
            title: main
                .as_ref()
                .and_then(|m| first_text(&[&m.name]))
                .unwrap_or("Main")
                .to_string(),
            server_id: "main".to_string(),
            href: url.to_string(),
        });
    }

    for (index, stream) in servers.iter().enumerate() {
        let Some(url) = first_text(&[&stream.url]) else {
            continue;
        };
        if server_list.iter().any(|s| s.href == url) {
            continue;
        }
        let name = first_text(&[&stream.name])
            .map(str::to_string)
            .unwrap_or_else(|| format!("Server {}", index + 1));
        server_list.push(VideoServer {
            title: name.clone(),
            server_id: name,
            href: url.to_string(),
        });
    }

    if server_list.is_empty() {
        return Vec::new();
    }
    vec![ServerQuality {
        title: "Streaming".to_string(),
        server_list,
    }]
}

/// `download_url_<quality>` maps → quality groups, lowest resolution first
fn download_groups(downloads: Map<String, Value>) -> Vec<QualityLinks> {
    let mut groups: Vec<(Option<u32>, QualityLinks)> = downloads
        .into_iter()
        .filter_map(|(key, mirrors)| {
            let quality = key.strip_prefix(DOWNLOAD_KEY_PREFIX).unwrap_or(&key).to_uppercase();
            let links: Vec<DownloadLink> = mirrors
                .as_object()?
                .iter()
                .filter_map(|(name, link)| {
                    let link = link.as_str().map(str::trim).filter(|l| !l.is_empty())?;
                    Some(DownloadLink {
                        title: name.clone(),
                        link: link.to_string(),
                    })
                })
                .collect();
            if links.is_empty() {
                return None;
            }
            let resolution = quality
                .trim_end_matches('P')
                .parse::<u32>()
                .ok();
            Some((resolution, QualityLinks { quality, links }))
        })
        .collect();

    groups.sort_by_key(|(resolution, _)| resolution.unwrap_or(u32::MAX));
    groups.into_iter().map(|(_, group)| group).collect()
}
