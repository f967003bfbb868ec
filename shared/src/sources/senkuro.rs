//! Senkuro: GraphQL API that only accepts persisted queries. Requests carry
//! the operation name and the sha256 of a query body the server already
//! knows, never the query text itself.

use std::collections::HashSet;

use log::{debug, error, info, trace, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::config::{Config, SenkuroConfig};
use crate::error::{Error, Result};
use crate::model::{
    ChapterList, ChapterSummary, ContentType, MangaDetails, MangaStatus,
    PageList, PageRequest, SearchResultItem,
};
use crate::source::{decode, host_of, optional, Source};
use crate::transport::{HttpTransport, Transport};
use crate::util::{
    first_non_empty, format_chapter_number, nullable, pick_localized, Localized,
    Numeric,
};

struct PersistedQuery {
    operation: &'static str,
    hash: &'static str,
}

const SEARCH: PersistedQuery = PersistedQuery {
    operation: "search",
    hash: "e64937b4fc9c921c2141f2995473161bed921c75855c5de934752392175936bc",
};

const FETCH_MANGA: PersistedQuery = PersistedQuery {
    operation: "fetchManga",
    hash: "6d8b28abb9a9ee3199f6553d8f0a61c005da8f5c56a88ebcf3778eff28d45bd5",
};

const FETCH_MANGA_CHAPTERS: PersistedQuery = PersistedQuery {
    operation: "fetchMangaChapters",
    hash: "8c854e121f05aa93b0c37889e732410df9ea207b4186c965c845a8d970bdcc12",
};

const FETCH_MANGA_CHAPTER: PersistedQuery = PersistedQuery {
    operation: "fetchMangaChapter",
    hash: "8e166106650d3659d21e7aadc15e7e59e5def36f1793a9b15287c73a1e27aa50",
};

impl PersistedQuery {
    fn body(&self, variables: Value) -> Value {
        json!({
            "operationName": self.operation,
            "variables": variables,
            "extensions": {
                "persistedQuery": {
                    "version": 1,
                    "sha256Hash": self.hash,
                }
            }
        })
    }
}

const CONTENT_TYPES: &[(&str, ContentType)] = &[
    ("MANGA", ContentType::Manga),
    ("MANHWA", ContentType::Manhwa),
    ("MANHUA", ContentType::Manhua),
    ("COMICS", ContentType::Comic),
    ("COMIC", ContentType::Comic),
];

const STATUSES: &[(&str, MangaStatus)] = &[
    ("ONGOING", MangaStatus::Ongoing),
    ("FINISHED", MangaStatus::Completed),
    ("COMPLETED", MangaStatus::Completed),
    ("HIATUS", MangaStatus::Hiatus),
    ("PAUSED", MangaStatus::Hiatus),
    ("CANCELLED", MangaStatus::Cancelled),
    ("STOPPED", MangaStatus::Cancelled),
    ("ANNOUNCE", MangaStatus::Announced),
    ("ANNOUNCED", MangaStatus::Announced),
];

#[derive(Deserialize, Debug)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default, deserialize_with = "nullable")]
    errors: Vec<Value>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawTitle {
    lang: Option<String>,
    content: Option<String>,
}

impl Localized for RawTitle {
    fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawLocalization {
    lang: Option<String>,
    #[serde(deserialize_with = "nullable")]
    description: Vec<RawBlock>,
}

impl Localized for RawLocalization {
    fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawBlock {
    #[serde(deserialize_with = "nullable")]
    content: Vec<RawInline>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawInline {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawUrl {
    url: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawImage {
    original: Option<RawUrl>,
    compress: Option<RawUrl>,
    medium: Option<RawUrl>,
}

impl RawImage {
    /// URL of the first rendition that has one.
    fn first_url(&self) -> Option<String> {
        first_non_empty(
            [&self.original, &self.compress, &self.medium]
                .into_iter()
                .map(|r| r.as_ref().and_then(|r| r.url.as_deref())),
        )
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawTag {
    name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    titles: Vec<RawTitle>,
    category: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawPerson {
    name: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawStaff {
    #[serde(deserialize_with = "nullable")]
    roles: Vec<String>,
    person: Option<RawPerson>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawBranch {
    id: Option<Value>,
    chapters: Option<Numeric>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawManga {
    slug: Option<String>,
    #[serde(deserialize_with = "nullable")]
    titles: Vec<RawTitle>,
    #[serde(deserialize_with = "nullable")]
    localizations: Vec<RawLocalization>,
    description: Option<Value>,
    cover: Option<RawImage>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    #[serde(rename = "releaseYear")]
    release_year: Option<Numeric>,
    rating: Option<Numeric>,
    views: Option<Numeric>,
    #[serde(deserialize_with = "nullable")]
    tags: Vec<RawTag>,
    #[serde(rename = "mainStaff", deserialize_with = "nullable")]
    main_staff: Vec<RawStaff>,
    #[serde(deserialize_with = "nullable")]
    branches: Vec<RawBranch>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawEdge<T: Default> {
    node: T,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawSearchData {
    search: Option<RawSearchConnection>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawSearchConnection {
    #[serde(deserialize_with = "nullable")]
    edges: Vec<RawEdge<RawManga>>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawMangaData {
    manga: Option<RawManga>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawChapter {
    slug: Option<String>,
    number: Option<Numeric>,
    volume: Option<Numeric>,
    #[serde(alias = "name")]
    title: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawPageInfo {
    #[serde(rename = "hasNextPage", deserialize_with = "nullable")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawChapterConnection {
    #[serde(deserialize_with = "nullable")]
    edges: Vec<RawEdge<RawChapter>>,
    #[serde(rename = "pageInfo")]
    page_info: Option<RawPageInfo>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawChaptersData {
    #[serde(rename = "mangaChapters")]
    manga_chapters: Option<RawChapterConnection>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawChapterPage {
    image: Option<RawImage>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawChapterContent {
    #[serde(deserialize_with = "nullable")]
    pages: Vec<RawChapterPage>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct RawChapterData {
    #[serde(rename = "mangaChapter")]
    manga_chapter: Option<RawChapterContent>,
}

fn lookup<T: Copy>(table: &[(&str, T)], value: Option<&str>) -> Option<T> {
    let value = value?.trim();
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(value))
        .map(|(_, v)| *v)
}

/// Title in `locale`, else the first one, else empty.
fn localized_title(titles: &[RawTitle], locale: &str) -> String {
    pick_localized(titles, locale)
        .and_then(|t| t.content.clone())
        .unwrap_or_default()
}

/// Plain text of a rich-text description: text items of a block are
/// concatenated, non-empty blocks are joined with newlines.
fn flatten_blocks(blocks: &[RawBlock]) -> String {
    blocks
        .iter()
        .map(|block| {
            block
                .content
                .iter()
                .filter(|item| item.kind.as_deref() == Some("text"))
                .filter_map(|item| item.text.as_deref())
                .collect::<String>()
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn description(manga: &RawManga, locale: &str) -> String {
    if let Some(localization) = pick_localized(&manga.localizations, locale) {
        let text = flatten_blocks(&localization.description);
        if !text.is_empty() {
            return text;
        }
    }

    match &manga.description {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(blocks @ Value::Array(_)) => {
            serde_json::from_value::<Vec<RawBlock>>(blocks.clone())
                .map(|blocks| flatten_blocks(&blocks))
                .unwrap_or_default()
        }
        _ => String::new(),
    }
}

fn has_role(roles: &[String], wanted: &[&str]) -> bool {
    roles.iter().any(|role| {
        let role = role.trim().to_ascii_lowercase().replace('_', "-");
        wanted.contains(&role.as_str())
    })
}

/// (author, artist). When several people qualify, the last one listed wins.
fn staff_credits(staff: &[RawStaff]) -> (String, String) {
    let mut author = String::new();
    let mut artist = String::new();

    for member in staff {
        let name = member
            .person
            .as_ref()
            .and_then(|p| p.name.clone())
            .unwrap_or_default();

        if has_role(&member.roles, &["story", "story-and-art"]) {
            author = name.clone();
        }
        if has_role(&member.roles, &["art", "story-and-art"]) {
            artist = name;
        }
    }

    (author, artist)
}

fn branch_id(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(value.clone()),
        Value::Number(_) => Some(value.clone()),
        _ => None,
    }
}

pub struct Senkuro {
    config: SenkuroConfig,
    web_host: String,
    transport: Box<dyn Transport>,
}

impl Senkuro {
    pub const KEY: &'static str = "senkuro";

    pub fn new(config: SenkuroConfig, transport: Box<dyn Transport>) -> Self {
        let web_host = host_of(&config.site_url);
        Self {
            config,
            web_host,
            transport,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transport =
            HttpTransport::new(config.timeout(), &config.user_agent, &[])?;

        Ok(Self::new(config.senkuro.clone(), Box::new(transport)))
    }

    fn web_url(&self, slug: &str) -> String {
        format!("{}/manga/{}", self.config.site_url.trim_end_matches('/'), slug)
    }

    fn locale(&self) -> &str {
        &self.config.primary_locale
    }

    /// Runs one persisted query. `Ok(None)` covers "no such item" and
    /// payloads that do not have the expected shape.
    fn query<T>(&self, query: &PersistedQuery, variables: Value) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = query.body(variables);
        trace!("{}: {}", query.operation, body);

        let res = self
            .transport
            .post(&self.config.api_url, &body)
            .map_err(|e| {
                error!("Senkuro {} failed: {}", query.operation, e);
                e
            });

        let Some(value) = optional(query.operation, res)? else {
            return Ok(None);
        };
        let Some(res) = decode::<GqlResponse<T>>(query.operation, value) else {
            return Ok(None);
        };

        if !res.errors.is_empty() {
            warn!("Senkuro {} returned errors: {:?}", query.operation, res.errors);
        }

        Ok(res.data)
    }

    fn fetch_manga(&self, slug: &str) -> Result<Option<RawManga>> {
        let data = self.query::<RawMangaData>(&FETCH_MANGA, json!({ "slug": slug }))?;
        Ok(data.and_then(|d| d.manga))
    }

    fn to_item(&self, manga: &RawManga, fallback_slug: &str) -> SearchResultItem {
        let slug = first_non_empty([manga.slug.as_deref(), Some(fallback_slug)])
            .unwrap_or_default();

        SearchResultItem {
            title: localized_title(&manga.titles, self.locale()),
            cover_url: manga
                .cover
                .as_ref()
                .and_then(RawImage::first_url)
                .unwrap_or_default(),
            description: description(manga, self.locale()),
            source: Self::KEY.to_string(),
            content_type: lookup(CONTENT_TYPES, manga.kind.as_deref())
                .unwrap_or_default(),
            year: manga.release_year.as_ref().and_then(Numeric::as_year),
            rating: manga.rating.as_ref().and_then(Numeric::as_f64),
            web_url: self.web_url(&slug),
            slug,
        }
    }

    /// One page of chapters. `None` when the page could not be read.
    fn chapter_page(
        &self,
        branch: &Value,
        after: Option<&str>,
    ) -> Result<Option<RawChapterConnection>> {
        let data = self.query::<RawChaptersData>(
            &FETCH_MANGA_CHAPTERS,
            json!({
                "after": after,
                "branchId": branch,
                "orderBy": { "direction": "ASC", "field": "NUMBER" },
            }),
        )?;

        Ok(data.and_then(|d| d.manga_chapters))
    }
}

impl Source for Senkuro {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn web_host(&self) -> &str {
        &self.web_host
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>> {
        debug!("search('{}', {})", query, limit);

        let data = self.query::<RawSearchData>(
            &SEARCH,
            json!({ "query": query, "type": "MANGA" }),
        )?;

        let edges = data
            .and_then(|d| d.search)
            .map(|s| s.edges)
            .unwrap_or_default();

        let items = edges
            .iter()
            .filter(|edge| edge.node.slug.is_some())
            .take(limit)
            .map(|edge| self.to_item(&edge.node, ""))
            .collect::<Vec<_>>();

        info!("Senkuro: {} results for '{}'", items.len(), query);
        Ok(items)
    }

    fn get_manga_details(&self, slug: &str) -> Result<Option<MangaDetails>> {
        debug!("get_manga_details('{}')", slug);

        let Some(manga) = self.fetch_manga(slug)? else {
            warn!("Senkuro: no manga '{}'", slug);
            return Ok(None);
        };

        let (author, artist) = staff_credits(&manga.main_staff);

        let mut details = MangaDetails {
            item: self.to_item(&manga, slug),
            author,
            artist,
            status: lookup(STATUSES, manga.status.as_deref()),
            genres: Vec::new(),
            total_chapters: manga
                .branches
                .first()
                .and_then(|b| b.chapters.as_ref())
                .and_then(Numeric::as_u32)
                .unwrap_or(0),
            views: manga.views.as_ref().and_then(Numeric::as_u64).unwrap_or(0),
        };

        for tag in &manga.tags {
            let is_genre = tag
                .category
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case("GENRE"))
                .unwrap_or(false);
            if !is_genre {
                continue;
            }

            let name = first_non_empty([tag.name.as_deref()])
                .unwrap_or_else(|| localized_title(&tag.titles, self.locale()));
            details.add_genre(&name);
        }

        Ok(Some(details))
    }

    fn get_chapters(&self, slug: &str, cancel: &CancelToken) -> Result<ChapterList> {
        debug!("get_chapters('{}')", slug);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let Some(manga) = self.fetch_manga(slug)? else {
            warn!("Senkuro: no manga '{}'", slug);
            return Ok(ChapterList::empty());
        };

        let Some(branch) = manga
            .branches
            .first()
            .and_then(|b| b.id.as_ref())
            .and_then(branch_id)
        else {
            warn!("Senkuro: no branches for '{}'", slug);
            return Ok(ChapterList::empty());
        };

        let mut chapters = Vec::new();
        let mut seen: HashSet<(u32, u64)> = HashSet::new();
        let mut after: Option<String> = None;

        for page in 0..self.config.max_chapter_pages {
            if cancel.is_cancelled() {
                warn!(
                    "Senkuro: chapter listing for '{}' cancelled after {} chapters",
                    slug,
                    chapters.len()
                );
                return Ok(ChapterList::partial(chapters));
            }

            trace!("Senkuro: '{}' chapter page {}", slug, page);

            let connection = match self.chapter_page(&branch, after.as_deref()) {
                Ok(Some(connection)) => connection,
                Ok(None) => {
                    warn!("Senkuro: unreadable chapter page {} for '{}'", page, slug);
                    return Ok(ChapterList::partial(chapters));
                }
                Err(e) => {
                    error!(
                        "Senkuro: chapter page {} for '{}' failed, keeping {} chapters: {}",
                        page,
                        slug,
                        chapters.len(),
                        e
                    );
                    return Ok(ChapterList::partial(chapters));
                }
            };

            for edge in connection.edges {
                let node = edge.node;

                let Some(number) = node.number.as_ref().and_then(Numeric::as_f64)
                else {
                    warn!("Senkuro: skipping chapter without a number in '{}'", slug);
                    continue;
                };
                let Some(reference) = first_non_empty([node.slug.as_deref()]) else {
                    warn!("Senkuro: skipping chapter {} without a slug in '{}'", number, slug);
                    continue;
                };

                let volume = node.volume.as_ref().and_then(Numeric::as_u32).unwrap_or(1);
                if !seen.insert((volume, number.to_bits())) {
                    debug!(
                        "Senkuro: chapter v{} c{} of '{}' already listed",
                        volume,
                        format_chapter_number(number),
                        slug
                    );
                    continue;
                }

                chapters.push(ChapterSummary {
                    number,
                    volume,
                    title: node.title.unwrap_or_default(),
                    reference,
                });
            }

            let info = connection.page_info.unwrap_or_default();
            if !info.has_next_page {
                info!("Senkuro: {} chapters for '{}'", chapters.len(), slug);
                return Ok(ChapterList::complete(chapters));
            }

            match info.end_cursor {
                Some(cursor) if !cursor.is_empty() && after.as_deref() != Some(cursor.as_str()) => {
                    after = Some(cursor);
                }
                _ => {
                    warn!(
                        "Senkuro: chapter cursor for '{}' did not advance, keeping {} chapters",
                        slug,
                        chapters.len()
                    );
                    return Ok(ChapterList::partial(chapters));
                }
            }
        }

        warn!(
            "Senkuro: stopped listing '{}' after {} pages ({} chapters)",
            slug,
            self.config.max_chapter_pages,
            chapters.len()
        );
        Ok(ChapterList::complete(chapters))
    }

    fn get_pages(&self, request: &PageRequest) -> Result<PageList> {
        let chapter = request.reference.trim();
        if chapter.is_empty() {
            warn!("Senkuro: get_pages without a chapter slug");
            return Ok(Vec::new());
        }

        debug!("get_pages('{}')", chapter);

        let data = self.query::<RawChapterData>(
            &FETCH_MANGA_CHAPTER,
            json!({ "cdnQuality": "auto", "slug": chapter }),
        )?;

        let Some(content) = data.and_then(|d| d.manga_chapter) else {
            warn!("Senkuro: no chapter '{}'", chapter);
            return Ok(Vec::new());
        };

        let pages = content
            .pages
            .iter()
            .filter_map(|p| p.image.as_ref().and_then(RawImage::first_url))
            .collect::<Vec<_>>();

        info!("Senkuro: {} pages for chapter '{}'", pages.len(), chapter);
        Ok(pages)
    }
}
