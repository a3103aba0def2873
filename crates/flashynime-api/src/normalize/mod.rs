//! Normalization of upstream payloads into canonical records.
//!
//! Normalizers are total: missing or malformed input degrades to
//! placeholder values, never to an error.

pub mod anime;
pub mod donghua;
pub mod manga;

use crate::payload::{NamedRef, RawRating, RawSynopsis, SourcePayload};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use shared::{Anime, ContentKind, Poster, Synopsis, NO_RATING};

pub use anime::{normalize_anime, normalize_anime_detail, normalize_anime_episode, normalize_batch};
pub use donghua::{normalize_donghua, normalize_donghua_detail, normalize_donghua_episode};
pub use manga::{normalize_manga, normalize_manga_chapter, normalize_manga_detail};

static LABEL_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:episode|chapter|ep|ch)(?:\.\s*|\s+)").expect("valid label marker pattern"));

/// Normalize any payload into the canonical record
pub fn normalize(payload: Option<SourcePayload>, kind: ContentKind) -> Anime {
    match payload {
        Some(SourcePayload::Anime(p)) => anime::from_payload(p),
        Some(SourcePayload::Donghua(p)) => donghua::from_payload(p),
        Some(SourcePayload::Manga(p)) => manga::from_payload(p),
        None => Anime::placeholder(kind),
    }
}

/// Normalize a raw JSON entry of the given category
pub fn normalize_value(kind: ContentKind, raw: &Value) -> Anime {
    normalize(SourcePayload::parse(kind, raw), kind)
}

/// Normalize every entry of a JSON array; non-arrays yield nothing
pub fn normalize_list(kind: ContentKind, raw: Option<&Value>) -> Vec<Anime> {
    raw.and_then(Value::as_array)
        .map(|items| items.iter().map(|item| normalize_value(kind, item)).collect())
        .unwrap_or_default()
}

/// First candidate that is present and not blank
pub(crate) fn first_text<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| Option::as_deref(*c))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

pub(crate) fn text_or_empty(candidates: &[&Option<String>]) -> String {
    first_text(candidates).unwrap_or_default().to_string()
}

/// Last non-empty path segment of a link
pub fn slug_from_href(href: &str) -> Option<String> {
    let href = href.trim();
    let path = match url::Url::parse(href) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Display score, or the no-rating sentinel
pub fn rating_label(rating: Option<&RawRating>) -> String {
    let label = match rating {
        Some(RawRating::Text(text)) => Some(text.clone()),
        Some(RawRating::Number(number)) => Some(number.to_string()),
        Some(RawRating::Scored { value, rating }) => value.clone().or_else(|| rating.clone()),
        None => None,
    };

    label
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_RATING.to_string())
}

/// Strip a leading `Ep` / `Episode` / `Chapter` / `Ch.` marker
pub fn strip_label_marker(label: &str) -> String {
    LABEL_MARKER.replace(label, "").trim().to_string()
}

pub(crate) fn genre_names(genres: &[NamedRef]) -> Vec<String> {
    genres
        .iter()
        .filter_map(NamedRef::label)
        .map(str::to_string)
        .collect()
}

pub(crate) fn poster_or_default(candidates: &[&Option<Poster>]) -> Poster {
    candidates
        .iter()
        .filter_map(|c| c.as_ref())
        .find(|p| !p.is_empty())
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn synopsis(raw: Option<RawSynopsis>) -> Synopsis {
    match raw {
        Some(RawSynopsis::Text(text)) => Synopsis::Text(text),
        Some(RawSynopsis::Paragraphs(paragraphs)) | Some(RawSynopsis::Structured { paragraphs }) => {
            Synopsis::Paragraphs(paragraphs)
        }
        None => Synopsis::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_label_marker() {
        assert_eq!(strip_label_marker("Ep 12"), "12");
        assert_eq!(strip_label_marker("Chapter 5"), "5");
        assert_eq!(strip_label_marker("Ch. 7"), "7");
        assert_eq!(strip_label_marker("episode 3"), "3");
        assert_eq!(strip_label_marker("EP.4"), "4");
        assert_eq!(strip_label_marker("Epic 1"), "Epic 1");
        assert_eq!(strip_label_marker("12"), "12");
    }

    #[test]
    fn test_slug_from_href() {
        assert_eq!(slug_from_href("https://site/anime/my-slug/").as_deref(), Some("my-slug"));
        assert_eq!(slug_from_href("/anime/other?x=1").as_deref(), Some("other"));
        assert_eq!(slug_from_href("https://site/"), None);
        assert_eq!(slug_from_href(""), None);
    }

    #[test]
    fn test_rating_label() {
        assert_eq!(rating_label(None), NO_RATING);
        assert_eq!(rating_label(Some(&RawRating::Text("  ".to_string()))), NO_RATING);
        assert_eq!(rating_label(Some(&RawRating::Text("8.2".to_string()))), "8.2");

        let scored = RawRating::Scored {
            value: None,
            rating: Some("7".to_string()),
        };
        assert_eq!(rating_label(Some(&scored)), "7");
    }

    #[test]
    fn test_null_normalizes_to_placeholder() {
        for kind in ContentKind::ALL {
            let anime = normalize_value(kind, &Value::Null);
            assert_eq!(anime.id, "unknown");
            assert_eq!(anime.title, "Unknown");
            assert_eq!(anime.poster.primary(), "");
            assert_eq!(anime.content_kind(), kind);
        }
    }

    #[test]
    fn test_normalize_list_ignores_non_arrays() {
        assert!(normalize_list(ContentKind::Anime, Some(&json!({"a": 1}))).is_empty());
        assert!(normalize_list(ContentKind::Anime, None).is_empty());

        let items = normalize_list(ContentKind::Anime, Some(&json!([{"animeId": "a"}, null])));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert!(items[1].is_unknown());
    }
}
