//! MangaLib: REST-style JSON API where every response field has to be
//! requested explicitly through repeated `fields[]` query parameters.

use log::{debug, error, info, trace, warn};
use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::config::{Config, MangaLibConfig};
use crate::error::{Error, Result};
use crate::model::{
    ChapterList, ChapterSummary, ContentType, MangaDetails, MangaStatus,
    PageList, PageRequest, SearchResultItem,
};
use crate::source::{decode, host_of, optional, Source};
use crate::transport::{HttpTransport, Transport};
use crate::util::{first_non_empty, format_chapter_number, nullable, Numeric};

const SEARCH_FIELDS: &[&str] = &["rate_avg", "rate", "releaseDate"];

const DETAILS_FIELDS: &[&str] = &[
    "background",
    "eng_name",
    "otherNames",
    "summary",
    "releaseDate",
    "type_id",
    "caution",
    "views",
    "close_view",
    "rate_avg",
    "rate",
    "genres",
    "tags",
    "teams",
    "user",
    "franchise",
    "authors",
    "publisher",
    "userRating",
    "moderated",
    "metadata",
    "metadata.count",
    "metadata.close_comments",
    "manga_status_id",
    "chap_count",
    "status_id",
    "artists",
    "format",
];

const CONTENT_TYPES: &[(&str, ContentType)] = &[
    ("Манга", ContentType::Manga),
    ("Манхва", ContentType::Manhwa),
    ("Маньхуа", ContentType::Manhua),
    ("Комикс", ContentType::Comic),
];

const STATUSES: &[(&str, MangaStatus)] = &[
    ("Онгоинг", MangaStatus::Ongoing),
    ("Завершён", MangaStatus::Completed),
    ("Приостановлен", MangaStatus::Hiatus),
    ("Выпуск прекращён", MangaStatus::Cancelled),
    ("Анонс", MangaStatus::Announced),
];

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize, Default, Debug)]
struct RawLabel {
    label: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct RawName {
    name: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawManga {
    name: Option<String>,
    rus_name: Option<String>,
    eng_name: Option<String>,
    slug_url: Option<String>,
    cover: Option<RawCover>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<RawLabel>,
    #[serde(rename = "releaseDate")]
    release_date: Option<Numeric>,
    rate_avg: Option<Numeric>,
    rating: Option<RawRating>,
    status: Option<RawLabel>,
    #[serde(deserialize_with = "nullable")]
    authors: Vec<RawName>,
    #[serde(deserialize_with = "nullable")]
    artists: Vec<RawName>,
    #[serde(deserialize_with = "nullable")]
    genres: Vec<RawName>,
    views: Option<RawViews>,
    items_count: Option<RawItemsCount>,
}

#[derive(Deserialize, Default, Debug)]
struct RawCover {
    #[serde(rename = "default")]
    url: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct RawRating {
    average: Option<Numeric>,
}

#[derive(Deserialize, Default, Debug)]
struct RawViews {
    total: Option<Numeric>,
}

#[derive(Deserialize, Default, Debug)]
struct RawItemsCount {
    uploaded: Option<Numeric>,
}

#[derive(Deserialize, Debug)]
struct RawChapter {
    number: Option<Numeric>,
    volume: Option<Numeric>,
    name: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct RawChapterContent {
    #[serde(default, deserialize_with = "nullable")]
    pages: Vec<RawPage>,
}

#[derive(Deserialize, Debug)]
struct RawPage {
    url: Option<String>,
}

fn content_type(label: Option<&str>) -> ContentType {
    label
        .and_then(|label| {
            CONTENT_TYPES
                .iter()
                .find(|(l, _)| *l == label.trim())
                .map(|(_, t)| *t)
        })
        .unwrap_or_default()
}

fn status(label: Option<&str>) -> Option<MangaStatus> {
    let label = label?.trim();
    STATUSES.iter().find(|(l, _)| *l == label).map(|(_, s)| *s)
}

fn fields_query(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| format!("fields[]={}", f))
        .collect::<Vec<_>>()
        .join("&")
}

fn join_names(names: &[RawName]) -> String {
    names
        .iter()
        .filter_map(|n| n.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct MangaLib {
    config: MangaLibConfig,
    web_host: String,
    transport: Box<dyn Transport>,
}

impl MangaLib {
    pub const KEY: &'static str = "mangalib";

    pub fn new(config: MangaLibConfig, transport: Box<dyn Transport>) -> Self {
        let web_host = host_of(&config.site_url);
        Self {
            config,
            web_host,
            transport,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let site = config.mangalib.site_url.trim_end_matches('/');
        let referer = format!("{}/", site);
        let site_id = config.mangalib.site_id.to_string();

        let transport = HttpTransport::new(
            config.timeout(),
            &config.user_agent,
            &[
                ("Accept", "*/*"),
                ("Accept-Language", "en-US,en;q=0.9"),
                ("Origin", site),
                ("Referer", referer.as_str()),
                ("Site-Id", site_id.as_str()),
            ],
        )?;

        Ok(Self::new(config.mangalib.clone(), Box::new(transport)))
    }

    fn api(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn site(&self) -> &str {
        self.config.site_url.trim_end_matches('/')
    }

    fn web_url(&self, slug: &str) -> String {
        format!("{}/{}", self.site(), slug)
    }

    /// The reference token handed out for a chapter. Callers store it as is
    /// and may later pass it back to `get_pages`.
    pub fn chapter_reference(&self, slug: &str, volume: u32, number: f64) -> String {
        format!(
            "{}/{}/v{}/c{}",
            self.site(),
            slug,
            volume,
            format_chapter_number(number)
        )
    }

    /// Inverse of `chapter_reference`.
    pub fn parse_reference(&self, reference: &str) -> Option<(String, u32, f64)> {
        let rest = reference.trim().strip_prefix(self.site())?;
        let parts = rest.trim_matches('/').split('/').collect::<Vec<_>>();

        let [slug, volume, number] = parts.as_slice() else {
            return None;
        };

        let volume = volume.strip_prefix('v')?.parse::<u32>().ok()?;
        let number = number.strip_prefix('c')?.parse::<f64>().ok()?;
        if slug.is_empty() || !number.is_finite() {
            return None;
        }

        Some((slug.to_string(), volume, number))
    }

    pub fn chapter_url(&self, slug: &str, volume: u32, number: f64) -> String {
        format!(
            "{}/{}/chapter?number={}&volume={}",
            self.api(),
            urlencoding::encode(slug),
            format_chapter_number(number),
            volume
        )
    }

    fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let host = self.config.image_host.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", host, path)
        } else {
            format!("{}/{}", host, path)
        }
    }

    fn fetch(&self, prefix: &str, url: &str) -> Result<Option<serde_json::Value>> {
        trace!("{}: {}", prefix, url);

        let res = self.transport.get(url).map_err(|e| {
            error!("MangaLib {} failed: {}", prefix, e);
            e
        });

        optional(prefix, res)
    }

    fn to_item(&self, raw: &RawManga, description: String) -> Option<SearchResultItem> {
        let slug = first_non_empty([raw.slug_url.as_deref()])?;

        Some(SearchResultItem {
            title: first_non_empty([
                raw.rus_name.as_deref(),
                raw.name.as_deref(),
                raw.eng_name.as_deref(),
            ])
            .unwrap_or_default(),
            cover_url: raw
                .cover
                .as_ref()
                .and_then(|c| c.url.clone())
                .unwrap_or_default(),
            description,
            source: Self::KEY.to_string(),
            content_type: content_type(
                raw.kind.as_ref().and_then(|k| k.label.as_deref()),
            ),
            year: raw.release_date.as_ref().and_then(Numeric::as_year),
            rating: raw.rate_avg.as_ref().and_then(Numeric::as_f64),
            web_url: self.web_url(&slug),
            slug,
        })
    }
}

impl Source for MangaLib {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn web_host(&self) -> &str {
        &self.web_host
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>> {
        debug!("search('{}', {})", query, limit);

        let url = format!(
            "{}?q={}&site_id[]={}&limit={}&{}",
            self.api(),
            urlencoding::encode(query),
            self.config.site_id,
            limit,
            fields_query(SEARCH_FIELDS)
        );

        let Some(value) = self.fetch("search", &url)? else {
            return Ok(Vec::new());
        };
        let Some(res) = decode::<Envelope<Vec<RawManga>>>("search", value)
        else {
            return Ok(Vec::new());
        };

        let items = res
            .data
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| {
                let summary = raw.summary.clone().unwrap_or_default();
                self.to_item(raw, summary)
            })
            .take(limit)
            .collect::<Vec<_>>();

        info!("MangaLib: {} results for '{}'", items.len(), query);
        Ok(items)
    }

    fn get_manga_details(&self, slug: &str) -> Result<Option<MangaDetails>> {
        debug!("get_manga_details('{}')", slug);

        let url = format!(
            "{}/{}?{}",
            self.api(),
            urlencoding::encode(slug),
            fields_query(DETAILS_FIELDS)
        );

        let Some(value) = self.fetch("details", &url)? else {
            return Ok(None);
        };
        let Some(raw) = decode::<Envelope<RawManga>>("details", value)
            .and_then(|res| res.data)
        else {
            warn!("MangaLib: no manga '{}'", slug);
            return Ok(None);
        };

        let description = first_non_empty([
            raw.summary.as_deref(),
            raw.description.as_deref(),
        ])
        .unwrap_or_default();

        let Some(mut item) = self.to_item(&raw, description) else {
            warn!("MangaLib: details for '{}' carry no slug", slug);
            return Ok(None);
        };
        if let Some(average) = raw
            .rating
            .as_ref()
            .and_then(|r| r.average.as_ref())
            .and_then(Numeric::as_f64)
        {
            item.rating = Some(average);
        }

        let mut details = MangaDetails {
            item,
            author: join_names(&raw.authors),
            artist: join_names(&raw.artists),
            status: status(raw.status.as_ref().and_then(|s| s.label.as_deref())),
            genres: Vec::new(),
            total_chapters: raw
                .items_count
                .as_ref()
                .and_then(|c| c.uploaded.as_ref())
                .and_then(Numeric::as_u32)
                .unwrap_or(0),
            views: raw
                .views
                .as_ref()
                .and_then(|v| v.total.as_ref())
                .and_then(Numeric::as_u64)
                .unwrap_or(0),
        };

        for genre in raw.genres.iter().filter_map(|g| g.name.as_deref()) {
            details.add_genre(genre);
        }

        Ok(Some(details))
    }

    fn get_chapters(&self, slug: &str, cancel: &CancelToken) -> Result<ChapterList> {
        debug!("get_chapters('{}')", slug);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let url = format!("{}/{}/chapters", self.api(), urlencoding::encode(slug));

        let Some(value) = self.fetch("chapters", &url)? else {
            return Ok(ChapterList::empty());
        };
        let Some(res) = decode::<Envelope<Vec<RawChapter>>>("chapters", value)
        else {
            return Ok(ChapterList::empty());
        };

        let mut chapters = Vec::new();
        for raw in res.data.unwrap_or_default() {
            let Some(number) = raw.number.as_ref().and_then(Numeric::as_f64)
            else {
                warn!("MangaLib: skipping chapter without a number in '{}'", slug);
                continue;
            };

            let volume = raw.volume.as_ref().and_then(Numeric::as_u32).unwrap_or(1);

            chapters.push(ChapterSummary {
                number,
                volume,
                title: raw.name.unwrap_or_default(),
                reference: self.chapter_reference(slug, volume, number),
            });
        }

        chapters.sort_by(|l, r| {
            l.number.total_cmp(&r.number).then(l.volume.cmp(&r.volume))
        });

        info!("MangaLib: {} chapters for '{}'", chapters.len(), slug);
        Ok(ChapterList::complete(chapters))
    }

    fn get_pages(&self, request: &PageRequest) -> Result<PageList> {
        let parsed = self.parse_reference(&request.reference);

        let slug = request
            .manga_slug
            .clone()
            .or_else(|| parsed.as_ref().map(|p| p.0.clone()));
        let volume = request.volume.or(parsed.as_ref().map(|p| p.1));
        let number = request.number.or(parsed.as_ref().map(|p| p.2));

        let (Some(slug), Some(volume), Some(number)) = (slug, volume, number)
        else {
            warn!(
                "MangaLib: cannot resolve pages for '{}' (slug, volume or number missing)",
                request.reference
            );
            return Ok(Vec::new());
        };

        debug!("get_pages('{}', v{}, c{})", slug, volume, number);

        let url = self.chapter_url(&slug, volume, number);
        let Some(value) = self.fetch("pages", &url)? else {
            return Ok(Vec::new());
        };
        let Some(content) = decode::<Envelope<RawChapterContent>>("pages", value)
            .and_then(|res| res.data)
        else {
            return Ok(Vec::new());
        };

        let pages = content
            .pages
            .iter()
            .filter_map(|p| p.url.as_deref())
            .filter(|p| !p.trim().is_empty())
            .map(|p| self.image_url(p))
            .collect::<Vec<_>>();

        info!(
            "MangaLib: {} pages for {} v{} c{}",
            pages.len(),
            slug,
            volume,
            format_chapter_number(number)
        );
        Ok(pages)
    }
}
