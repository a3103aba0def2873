//! Manga source (`/comic`).

use super::{first_text, genre_names, poster_or_default, rating_label, strip_label_marker, synopsis, text_or_empty};
use crate::payload::{parse_object, ChapterRef, MangaChapterPayload, MangaDetailPayload, MangaSourcePayload};
use serde_json::Value;
use shared::{Anime, AnimeDetail, ContentKind, EpisodeRef, MangaChapter, UNKNOWN_ID};

const DEFAULT_TYPE: &str = "Manga";

/// Normalize one raw manga entry
pub fn normalize_manga(raw: &Value) -> Anime {
    super::normalize_value(ContentKind::Manga, raw)
}

pub(crate) fn from_payload(p: MangaSourcePayload) -> Anime {
    let episode = first_text(&[&p.latest_chapter, &p.chapter])
        .or_else(|| p.chapters.first().and_then(ChapterRef::label))
        .map(strip_label_marker)
        .unwrap_or_default();

    Anime {
        id: first_text(&[&p.slug]).unwrap_or(UNKNOWN_ID).to_string(),
        title: first_text(&[&p.title]).unwrap_or("Unknown").to_string(),
        poster: poster_or_default(&[&p.poster, &p.image, &p.thumbnail]),
        status: text_or_empty(&[&p.status]),
        rating: rating_label(p.rating.as_ref()),
        genres: genre_names(&p.genres),
        episode,
        kind: first_text(&[&p.kind]).unwrap_or(DEFAULT_TYPE).to_string(),
        release_day: text_or_empty(&[&p.released]),
        last_update: text_or_empty(&[&p.updated]),
        is_donghua: false,
        is_manga: true,
        rank: None,
    }
}

/// Normalize a manga detail page. Chapters stay newest-first.
pub fn normalize_manga_detail(id: &str, raw: &Value) -> AnimeDetail {
    let Some(p) = parse_object::<MangaDetailPayload>(raw) else {
        let mut anime = Anime::placeholder(ContentKind::Manga);
        anime.id = id.to_string();
        return AnimeDetail::from_summary(anime);
    };

    let episode_list: Vec<EpisodeRef> = p
        .summary
        .chapters
        .iter()
        .filter_map(|chapter| {
            let slug = first_text(&[&chapter.slug])?;
            Some(EpisodeRef {
                title: chapter.label().unwrap_or(slug).trim().to_string(),
                id: slug.to_string(),
            })
        })
        .collect();
    let total_episodes = (!episode_list.is_empty()).then(|| episode_list.len().to_string());
    let score = p.summary.rating.is_some().then(|| rating_label(p.summary.rating.as_ref()));
    let release_date = first_text(&[&p.summary.released]).map(str::to_string);

    let mut anime = from_payload(p.summary);
    if anime.is_unknown() && !id.is_empty() {
        anime.id = id.to_string();
    }

    AnimeDetail {
        anime,
        synopsis: synopsis(p.synopsis),
        episode_list,
        batch_link: None,
        japanese_title: first_text(&[&p.alternative]).map(str::to_string),
        english_title: None,
        score,
        studio: None,
        producer: None,
        author: first_text(&[&p.author]).map(str::to_string),
        duration: None,
        total_episodes,
        release_date,
        recommendations: Vec::new(),
    }
}

/// Normalize a chapter reader page.
///
/// `chapters` is the owning manga's chapter list (newest first). It is used
/// for navigation when the page itself does not link its neighbours.
pub fn normalize_manga_chapter(id: &str, raw: &Value, chapters: &[EpisodeRef]) -> MangaChapter {
    let p = parse_object::<MangaChapterPayload>(raw).unwrap_or_default();
    let (derived_prev, derived_next) = chapter_navigation(id, chapters);

    MangaChapter {
        id: id.to_string(),
        title: first_text(&[&p.title]).unwrap_or(id).to_string(),
        manga_id: first_text(&[&p.comic_slug]).unwrap_or(UNKNOWN_ID).to_string(),
        images: p
            .images
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect(),
        prev_chapter: first_text(&[&p.prev_chapter]).map(str::to_string).or(derived_prev),
        next_chapter: first_text(&[&p.next_chapter]).map(str::to_string).or(derived_next),
    }
}

/// Previous and next chapter ids around `id` in a newest-first list
pub fn chapter_navigation(id: &str, chapters: &[EpisodeRef]) -> (Option<String>, Option<String>) {
    let Some(index) = chapters.iter().position(|c| c.id == id) else {
        return (None, None);
    };

    let prev = chapters.get(index + 1).map(|c| c.id.clone());
    let next = index.checked_sub(1).and_then(|i| chapters.get(i)).map(|c| c.id.clone());
    (prev, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chapters() -> Vec<EpisodeRef> {
        (1..=3)
            .rev()
            .map(|n| EpisodeRef {
                title: n.to_string(),
                id: format!("m-chapter-{}", n),
            })
            .collect()
    }

    #[test]
    fn test_entry() {
        let manga = normalize_manga(&json!({
            "slug": "solo",
            "title": "Solo",
            "image": "img.jpg",
            "type": "Manhwa",
            "latestChapter": "Chapter 5",
            "genres": ["Action"],
        }));

        assert_eq!(manga.id, "solo");
        assert!(manga.is_manga);
        assert_eq!(manga.poster.primary(), "img.jpg");
        assert_eq!(manga.kind, "Manhwa");
        assert_eq!(manga.episode, "5");
        assert_eq!(manga.genres, vec!["Action"]);
    }

    #[test]
    fn test_entry_fallbacks() {
        let manga = normalize_manga(&json!({
            "id": "ignored",
            "thumbnail": "t.jpg",
            "chapters": [{"chapter": "Ch. 9", "slug": "x-9"}],
        }));

        assert_eq!(manga.id, UNKNOWN_ID);
        assert_eq!(manga.poster.primary(), "t.jpg");
        assert_eq!(manga.episode, "9");
        assert_eq!(manga.kind, "Manga");
    }

    #[test]
    fn test_detail() {
        let detail = normalize_manga_detail(
            "solo",
            &json!({
                "slug": "solo",
                "title": "Solo",
                "author": "Chugong",
                "alternative": "나 혼자만 레벨업",
                "synopsis": ["p1", "p2"],
                "chapters": [
                    {"title": "Chapter 2", "slug": "solo-chapter-2"},
                    {"title": "Chapter 1", "slug": "solo-chapter-1"},
                    {"title": "No slug"}
                ],
            }),
        );

        assert_eq!(detail.anime.id, "solo");
        assert_eq!(detail.author.as_deref(), Some("Chugong"));
        assert_eq!(detail.episode_list.len(), 2);
        assert_eq!(detail.episode_list[0].id, "solo-chapter-2");
        assert_eq!(detail.total_episodes.as_deref(), Some("2"));
        assert_eq!(detail.anime.episode, "2");
    }

    #[test]
    fn test_navigation() {
        let list = chapters();
        assert_eq!(
            chapter_navigation("m-chapter-2", &list),
            (Some("m-chapter-1".to_string()), Some("m-chapter-3".to_string()))
        );
        assert_eq!(chapter_navigation("m-chapter-3", &list), (Some("m-chapter-2".to_string()), None));
        assert_eq!(chapter_navigation("m-chapter-1", &list), (None, Some("m-chapter-2".to_string())));
        assert_eq!(chapter_navigation("missing", &list), (None, None));
    }

    #[test]
    fn test_chapter() {
        let chapter = normalize_manga_chapter(
            "m-chapter-2",
            &json!({"title": "Chapter 2", "comicSlug": "m", "images": ["a.jpg", " ", "b.jpg"]}),
            &chapters(),
        );

        assert_eq!(chapter.manga_id, "m");
        assert_eq!(chapter.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(chapter.prev_chapter.as_deref(), Some("m-chapter-1"));
        assert_eq!(chapter.next_chapter.as_deref(), Some("m-chapter-3"));
    }

    #[test]
    fn test_chapter_links_from_page_win() {
        let chapter = normalize_manga_chapter(
            "m-chapter-2",
            &json!({"comicSlug": "m", "nextChapter": "m-chapter-2-5"}),
            &chapters(),
        );
        assert_eq!(chapter.next_chapter.as_deref(), Some("m-chapter-2-5"));
        assert_eq!(chapter.prev_chapter.as_deref(), Some("m-chapter-1"));
    }
}
