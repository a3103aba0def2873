//! Canonical content records.
//!
//! Every upstream category (anime, donghua, manga) is normalized into these
//! shapes before it reaches a caller. Field names serialize the same way the
//! records have always been stored, so persisted watchlists stay readable.

use serde::{Deserialize, Serialize};

/// Placeholder id used when no identifier could be resolved.
pub const UNKNOWN_ID: &str = "unknown";

/// Rating sentinel used when the upstream has no score.
pub const NO_RATING: &str = "N/A";

/// Content category of a canonical record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Anime,
    Donghua,
    Manga,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Anime, ContentKind::Donghua, ContentKind::Manga];

    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::Anime => "anime",
            ContentKind::Donghua => "donghua",
            ContentKind::Manga => "manga",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anime" => Ok(ContentKind::Anime),
            "donghua" => Ok(ContentKind::Donghua),
            "manga" | "comic" => Ok(ContentKind::Manga),
            _ => Err(anyhow::anyhow!("Invalid content kind: {}", s)),
        }
    }
}

/// Poster image: upstream sends either one URL or a list of URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Poster {
    Single(String),
    Many(Vec<String>),
}

impl Poster {
    /// Primary image URL, or an empty string when there is none.
    pub fn primary(&self) -> &str {
        match self {
            Poster::Single(url) => url,
            Poster::Many(urls) => urls.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary().is_empty()
    }
}

impl Default for Poster {
    fn default() -> Self {
        Poster::Single(String::new())
    }
}

impl From<&str> for Poster {
    fn from(url: &str) -> Self {
        Poster::Single(url.to_string())
    }
}

/// Canonical content record shared by every category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub poster: Poster,
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_rating")]
    pub rating: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub episode: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub release_day: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(rename = "isDonghua", default)]
    pub is_donghua: bool,
    #[serde(rename = "isManga", default)]
    pub is_manga: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

fn default_rating() -> String {
    NO_RATING.to_string()
}

impl Anime {
    /// Placeholder record returned when upstream data is missing entirely.
    pub fn placeholder(kind: ContentKind) -> Self {
        Self {
            id: UNKNOWN_ID.to_string(),
            title: "Unknown".to_string(),
            poster: Poster::default(),
            status: String::new(),
            rating: default_rating(),
            genres: Vec::new(),
            episode: String::new(),
            kind: String::new(),
            release_day: String::new(),
            last_update: String::new(),
            is_donghua: kind == ContentKind::Donghua,
            is_manga: kind == ContentKind::Manga,
            rank: None,
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        if self.is_manga {
            ContentKind::Manga
        } else if self.is_donghua {
            ContentKind::Donghua
        } else {
            ContentKind::Anime
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_ID
    }
}

/// Synopsis text: a single block or a list of paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Synopsis {
    Text(String),
    Paragraphs(Vec<String>),
}

impl Synopsis {
    pub fn to_text(&self) -> String {
        match self {
            Synopsis::Text(text) => text.clone(),
            Synopsis::Paragraphs(paragraphs) => paragraphs.join("\n\n"),
        }
    }
}

impl Default for Synopsis {
    fn default() -> Self {
        Synopsis::Paragraphs(Vec::new())
    }
}

/// Entry in an episode or chapter list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub title: String,
    pub id: String,
}

/// Link to a batch download page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLink {
    pub id: String,
    pub link: String,
    pub text: String,
}

/// Full content record shown on a detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeDetail {
    #[serde(flatten)]
    pub anime: Anime,
    pub synopsis: Synopsis,
    pub episode_list: Vec<EpisodeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_link: Option<BatchLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub japanese_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<Anime>,
}

impl AnimeDetail {
    /// Detail record with only the summary fields filled in.
    pub fn from_summary(anime: Anime) -> Self {
        Self {
            anime,
            synopsis: Synopsis::default(),
            episode_list: Vec::new(),
            batch_link: None,
            japanese_title: None,
            english_title: None,
            score: None,
            studio: None,
            producer: None,
            author: None,
            duration: None,
            total_episodes: None,
            release_date: None,
            recommendations: Vec::new(),
        }
    }
}

/// One playable server inside a quality group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoServer {
    pub title: String,
    #[serde(rename = "serverId")]
    pub server_id: String,
    pub href: String,
}

/// Servers grouped under one quality label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerQuality {
    pub title: String,
    #[serde(rename = "serverList")]
    pub server_list: Vec<VideoServer>,
}

/// A single download mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub title: String,
    pub link: String,
}

/// Download mirrors grouped under one quality label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLinks {
    pub quality: String,
    pub links: Vec<DownloadLink>,
}

/// Playable episode with its streams and downloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub id: String,
    pub title: String,
    pub anime_id: String,
    pub stream_link: String,
    #[serde(default)]
    pub servers: Vec<ServerQuality>,
    #[serde(default)]
    pub download_links: Vec<QualityLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_episode: Option<String>,
}

/// Batch download page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDetail {
    pub id: String,
    pub title: String,
    pub poster: Poster,
    pub status: String,
    pub download_links: Vec<QualityLinks>,
}

/// Manga chapter pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaChapter {
    pub id: String,
    pub title: String,
    pub manga_id: String,
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chapter: Option<String>,
}

/// Genre filter entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
}

/// Releases for one day of the week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub day: String,
    pub anime_list: Vec<Anime>,
}

/// Upstream page metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub current_page: Option<u32>,
    pub has_prev_page: bool,
    pub prev_page: Option<u32>,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// A page of canonical records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub items: Vec<Anime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl Listing {
    pub fn new(items: Vec<Anime>) -> Self {
        Self {
            items,
            pagination: None,
        }
    }
}

/// One named strip of a home page (`recent`, `popular`, `top10`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeSection {
    pub name: String,
    pub items: Vec<Anime>,
}

/// Home page of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeSections {
    pub kind: ContentKind,
    pub sections: Vec<HomeSection>,
}

impl HomeSections {
    pub fn section(&self, name: &str) -> Option<&[Anime]> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.items.as_slice())
    }
}
