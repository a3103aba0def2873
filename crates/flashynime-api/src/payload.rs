//! Upstream response shapes.
//!
//! The upstream API serves three unrelated schemas and is loose about
//! types (numbers where strings are expected, single values where lists
//! are expected). Every field here deserializes leniently: a field with an
//! unexpected shape becomes `None`/empty instead of failing the record.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::{ContentKind, Poster};

/// Text field that tolerates numbers, booleans and lists of names
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => map.get("title").or_else(|| map.get("name")).and_then(value_text),
                    other => value_text(other),
                })
                .filter(|s| !s.trim().is_empty())
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        _ => None,
    }
}

/// Any deserializable field; a mismatched shape becomes `None`
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// List field; non-list values become empty and bad elements are skipped
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// Deserialize `raw` as `T` if it is a JSON object
pub fn parse_object<T: DeserializeOwned>(raw: &Value) -> Option<T> {
    if !raw.is_object() {
        return None;
    }
    serde_json::from_value(raw.clone()).ok()
}

/// Score as sent upstream: bare text, a number, or `{value}` / `{rating}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawRating {
    Text(String),
    Number(serde_json::Number),
    Scored {
        #[serde(default, deserialize_with = "text")]
        value: Option<String>,
        #[serde(default, deserialize_with = "text")]
        rating: Option<String>,
    },
}

/// Synopsis as sent upstream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawSynopsis {
    Text(String),
    Paragraphs(Vec<String>),
    Structured {
        #[serde(default, deserialize_with = "list")]
        paragraphs: Vec<String>,
    },
}

/// `{title}` or `{name}` reference, or a bare string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NamedRef {
    Name(String),
    Object {
        #[serde(default, deserialize_with = "text")]
        title: Option<String>,
        #[serde(default, deserialize_with = "text")]
        name: Option<String>,
    },
}

impl NamedRef {
    pub fn label(&self) -> Option<&str> {
        let label = match self {
            NamedRef::Name(name) => Some(name.as_str()),
            NamedRef::Object { title, name } => title.as_deref().or(name.as_deref()),
        };
        label.map(str::trim).filter(|s| !s.is_empty())
    }
}

// ========== Anime source ==========

/// Anime list/home entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeSourcePayload {
    #[serde(default, deserialize_with = "text")]
    pub anime_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub episode_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub batch_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub href: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster: Option<Poster>,
    #[serde(default, deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub score: Option<RawRating>,
    #[serde(default, deserialize_with = "list")]
    pub genre_list: Vec<NamedRef>,
    #[serde(default, deserialize_with = "text")]
    pub episodes: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub episode: Option<String>,
    #[serde(default, deserialize_with = "text", rename = "current_episode")]
    pub current_episode: Option<String>,
    #[serde(default, deserialize_with = "text", rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub released_on: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub rank: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRef {
    #[serde(default, deserialize_with = "text")]
    pub batch_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeEpisodeRef {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub episode_id: Option<String>,
}

/// Anime detail page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetailPayload {
    #[serde(flatten)]
    pub summary: AnimeSourcePayload,
    #[serde(default, deserialize_with = "text")]
    pub japanese: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub english: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub producers: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub studios: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub synopsis: Option<RawSynopsis>,
    #[serde(default, deserialize_with = "text")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub aired: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub batch_list: Vec<BatchRef>,
    #[serde(default, deserialize_with = "list")]
    pub episode_list: Vec<AnimeEpisodeRef>,
    #[serde(default, deserialize_with = "list")]
    pub recommended_anime_list: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServer {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub server_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServerQuality {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub server_list: Vec<RawServer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawServerBlock {
    #[serde(default, deserialize_with = "list")]
    pub qualities: Vec<RawServerQuality>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawUrl {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDownloadQuality {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub urls: Vec<RawUrl>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDownloadFormat {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub qualities: Vec<RawDownloadQuality>,
}

/// `downloadUrl` block shared by episode and batch pages
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDownloads {
    #[serde(default, deserialize_with = "list")]
    pub formats: Vec<RawDownloadFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEpisodeLink {
    #[serde(default, deserialize_with = "text")]
    pub episode_id: Option<String>,
}

/// Anime episode page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeEpisodePayload {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub anime_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub default_streaming_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub server: Option<RawServerBlock>,
    #[serde(default, deserialize_with = "lenient")]
    pub download_url: Option<RawDownloads>,
    #[serde(default, deserialize_with = "flag")]
    pub has_prev_episode: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub prev_episode: Option<RawEpisodeLink>,
    #[serde(default, deserialize_with = "flag")]
    pub has_next_episode: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub next_episode: Option<RawEpisodeLink>,
}

/// Batch download page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster: Option<Poster>,
    #[serde(default, deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub download_url: Option<RawDownloads>,
}

// ========== Donghua source ==========

/// Donghua list/home entry. Latest-release lists embed episodes; those
/// carry their parent series in `donghua_details`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DonghuaSourcePayload {
    #[serde(default, deserialize_with = "text")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster: Option<Poster>,
    #[serde(default, deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<RawRating>,
    #[serde(default, deserialize_with = "list")]
    pub genres: Vec<NamedRef>,
    #[serde(default, deserialize_with = "text")]
    pub current_episode: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub episode: Option<String>,
    #[serde(default, deserialize_with = "text", rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub released: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub released_on: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub updated_on: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub donghua_details: Option<Box<DonghuaSourcePayload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DonghuaEpisodeRef {
    #[serde(default, deserialize_with = "text")]
    pub episode: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub slug: Option<String>,
}

/// Donghua detail page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DonghuaDetailPayload {
    #[serde(flatten)]
    pub summary: DonghuaSourcePayload,
    #[serde(default, deserialize_with = "text")]
    pub alter_title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub network: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub studio: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub synopsis: Option<RawSynopsis>,
    #[serde(default, deserialize_with = "text")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub episodes_count: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub episodes_list: Vec<DonghuaEpisodeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStream {
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStreaming {
    #[serde(default, deserialize_with = "lenient")]
    pub main_url: Option<RawStream>,
    #[serde(default, deserialize_with = "list")]
    pub servers: Vec<RawStream>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSlugRef {
    #[serde(default, deserialize_with = "text")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawNavigation {
    #[serde(default, deserialize_with = "lenient")]
    pub previous_episode: Option<RawSlugRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub next_episode: Option<RawSlugRef>,
}

/// Donghua episode page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DonghuaEpisodePayload {
    #[serde(default, deserialize_with = "text")]
    pub episode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub streaming: Option<RawStreaming>,
    /// `download_url_<quality>` → mirror name → link
    #[serde(default, deserialize_with = "lenient")]
    pub download_url: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub donghua_details: Option<RawSlugRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub navigation: Option<RawNavigation>,
}

// ========== Manga source ==========

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChapterRef {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub chapter: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub slug: Option<String>,
}

impl ChapterRef {
    pub fn label(&self) -> Option<&str> {
        self.chapter
            .as_deref()
            .or(self.title.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Manga list/home entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaSourcePayload {
    #[serde(default, deserialize_with = "text")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster: Option<Poster>,
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<Poster>,
    #[serde(default, deserialize_with = "lenient")]
    pub thumbnail: Option<Poster>,
    #[serde(default, deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "text", rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<RawRating>,
    #[serde(default, deserialize_with = "list")]
    pub genres: Vec<NamedRef>,
    #[serde(default, deserialize_with = "text")]
    pub latest_chapter: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub chapter: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub chapters: Vec<ChapterRef>,
    #[serde(default, deserialize_with = "text")]
    pub released: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub updated: Option<String>,
}

/// Manga detail page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MangaDetailPayload {
    #[serde(flatten)]
    pub summary: MangaSourcePayload,
    #[serde(default, deserialize_with = "text")]
    pub alternative: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub synopsis: Option<RawSynopsis>,
}

/// Manga chapter reader page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaChapterPayload {
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub comic_slug: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "text")]
    pub prev_chapter: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub next_chapter: Option<String>,
}

/// A list entry tagged with the source schema it came from
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Anime(AnimeSourcePayload),
    Donghua(DonghuaSourcePayload),
    Manga(MangaSourcePayload),
}

impl SourcePayload {
    /// Validate a raw entry against the schema of `kind`. Null, non-object
    /// and undecodable values yield `None`.
    pub fn parse(kind: ContentKind, raw: &Value) -> Option<Self> {
        match kind {
            ContentKind::Anime => parse_object(raw).map(SourcePayload::Anime),
            ContentKind::Donghua => parse_object(raw).map(SourcePayload::Donghua),
            ContentKind::Manga => parse_object(raw).map(SourcePayload::Manga),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            SourcePayload::Anime(_) => ContentKind::Anime,
            SourcePayload::Donghua(_) => ContentKind::Donghua,
            SourcePayload::Manga(_) => ContentKind::Manga,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_accepts_numbers_and_lists() {
        let payload: AnimeSourcePayload = parse_object(&json!({
            "animeId": 42,
            "episodes": 12,
            "title": ["A", {"title": "B"}],
        }))
        .unwrap();

        assert_eq!(payload.anime_id.as_deref(), Some("42"));
        assert_eq!(payload.episodes.as_deref(), Some("12"));
        assert_eq!(payload.title.as_deref(), Some("A, B"));
    }

    #[test]
    fn test_mismatched_fields_degrade() {
        let payload: AnimeSourcePayload = parse_object(&json!({
            "animeId": "ok",
            "poster": {"weird": true},
            "genreList": "Action",
            "score": true,
        }))
        .unwrap();

        assert_eq!(payload.anime_id.as_deref(), Some("ok"));
        assert_eq!(payload.poster, None);
        assert!(payload.genre_list.is_empty());
        assert_eq!(payload.score, None);
    }

    #[test]
    fn test_rating_shapes() {
        let cases = [
            (json!("8.1"), RawRating::Text("8.1".to_string())),
            (
                json!({"value": "7.5", "users": 1000}),
                RawRating::Scored {
                    value: Some("7.5".to_string()),
                    rating: None,
                },
            ),
        ];
        for (raw, expected) in cases {
            let parsed: RawRating = serde_json::from_value(raw).unwrap();
            assert_eq!(parsed, expected);
        }
    }

    #[test]
    fn test_synopsis_shapes() {
        let structured: RawSynopsis = serde_json::from_value(json!({"paragraphs": ["a", "b"]})).unwrap();
        assert_eq!(
            structured,
            RawSynopsis::Structured {
                paragraphs: vec!["a".to_string(), "b".to_string()]
            }
        );

        let text: RawSynopsis = serde_json::from_value(json!("plain")).unwrap();
        assert_eq!(text, RawSynopsis::Text("plain".to_string()));
    }

    #[test]
    fn test_nested_donghua_details() {
        let payload: DonghuaSourcePayload = parse_object(&json!({
            "slug": "btth-episode-42",
            "donghua_details": {"slug": "btth", "title": "Battle Through the Heavens"}
        }))
        .unwrap();

        let parent = payload.donghua_details.unwrap();
        assert_eq!(parent.slug.as_deref(), Some("btth"));
    }

    #[test]
    fn test_source_payload_rejects_non_objects() {
        assert!(SourcePayload::parse(ContentKind::Anime, &Value::Null).is_none());
        assert!(SourcePayload::parse(ContentKind::Manga, &json!("slug")).is_none());
        assert!(SourcePayload::parse(ContentKind::Donghua, &json!([])).is_none());

        let parsed = SourcePayload::parse(ContentKind::Manga, &json!({"slug": "x"})).unwrap();
        assert_eq!(parsed.kind(), ContentKind::Manga);
    }

    #[test]
    fn test_flag_only_true_for_true() {
        let payload: AnimeEpisodePayload = parse_object(&json!({
            "hasPrevEpisode": "yes",
            "hasNextEpisode": true,
        }))
        .unwrap();
        assert!(!payload.has_prev_episode);
        assert!(payload.has_next_episode);
    }
}
