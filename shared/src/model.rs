use serde::{Deserialize, Serialize};

use crate::util::format_chapter_number;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ContentType {
    #[default]
    Manga,
    Manhwa,
    Manhua,
    Comic,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum MangaStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    Announced,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct SearchResultItem {
    pub title: String,
    pub slug: String,
    #[serde(rename = "coverUrl")]
    pub cover_url: String,
    pub description: String,
    pub source: String,
    #[serde(rename = "contentType")]
    pub content_type: ContentType,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    #[serde(rename = "webUrl")]
    pub web_url: String,
}

/// Everything a search hit carries plus the fields only a details call
/// returns. `item.description` holds the full plain-text description here.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct MangaDetails {
    #[serde(flatten)]
    pub item: SearchResultItem,

    pub author: String,
    pub artist: String,
    pub status: Option<MangaStatus>,
    pub genres: Vec<String>,

    #[serde(rename = "totalChapters")]
    pub total_chapters: u32,
    pub views: u64,
}

impl MangaDetails {
    /// Adds a genre unless it is empty or already present.
    pub fn add_genre(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || self.genres.iter().any(|g| g == name) {
            return;
        }

        self.genres.push(name.to_string());
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ChapterSummary {
    pub number: f64,
    pub volume: u32,
    pub title: String,
    /// Opaque to everything except the source that produced it.
    pub reference: String,
}

impl ChapterSummary {
    pub fn display_number(&self) -> String {
        format_chapter_number(self.number)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ChapterList {
    pub chapters: Vec<ChapterSummary>,
    /// `false` when pagination stopped early and the list may be partial.
    pub complete: bool,
}

impl ChapterList {
    pub fn complete(chapters: Vec<ChapterSummary>) -> Self {
        Self {
            chapters,
            complete: true,
        }
    }

    pub fn partial(chapters: Vec<ChapterSummary>) -> Self {
        Self {
            chapters,
            complete: false,
        }
    }

    pub fn empty() -> Self {
        Self::complete(Vec::new())
    }
}

pub type PageList = Vec<String>;

/// Input of `Source::get_pages`. The reference is always present; the
/// other keys are filled in by callers that have them on record.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PageRequest {
    pub reference: String,
    pub manga_slug: Option<String>,
    pub volume: Option<u32>,
    pub number: Option<f64>,
}

impl PageRequest {
    pub fn from_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    pub fn for_chapter(manga_slug: &str, chapter: &ChapterSummary) -> Self {
        Self {
            reference: chapter.reference.clone(),
            manga_slug: Some(manga_slug.to_string()),
            volume: Some(chapter.volume),
            number: Some(chapter.number),
        }
    }
}

/// One source's share of an aggregated search.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct SourceResults {
    pub source: String,
    pub items: Vec<SearchResultItem>,
    pub error: Option<String>,
}

impl SourceResults {
    pub fn failed(source: &str, error: String) -> Self {
        Self {
            source: source.to_string(),
            items: Vec::new(),
            error: Some(error),
        }
    }
}
