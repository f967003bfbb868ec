use log::warn;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::model::{ChapterList, MangaDetails, PageList, PageRequest, SearchResultItem};

/// A remote catalog service.
///
/// Malformed payloads and "not found" answers are reported as empty data
/// (`Ok(vec![])`, `Ok(None)`). `Err` is reserved for the call itself failing
/// (network, timeout, non-success status) so callers can tell the two apart.
pub trait Source: Send + Sync {
    /// Registry key, lower case.
    fn key(&self) -> &str;

    /// Host of the source's public web pages (e.g. `mangalib.org`).
    fn web_host(&self) -> &str;

    /// At most `limit` hits, each tagged with `key()`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>>;

    fn get_manga_details(&self, slug: &str) -> Result<Option<MangaDetails>>;

    /// Every chapter of `slug` in ascending number order. Pagination stops
    /// early when `cancel` trips, in which case the list is marked partial.
    fn get_chapters(&self, slug: &str, cancel: &CancelToken) -> Result<ChapterList>;

    /// Page image URLs in reading order. `request.reference` must come from
    /// this source's own `get_chapters`.
    fn get_pages(&self, request: &PageRequest) -> Result<PageList>;

    fn owns_url(&self, url: &str) -> bool {
        host_matches(url, self.web_host())
    }
}

/// True when `url`'s host is `host` or one of its subdomains.
pub fn host_matches(url: &str, host: &str) -> bool {
    let host = host.trim().trim_start_matches("www.").to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }

    let Ok(url) = Url::parse(url) else {
        return false;
    };
    let Some(url_host) = url.host_str() else {
        return false;
    };

    let url_host = url_host.to_ascii_lowercase();
    url_host == host || url_host.ends_with(&format!(".{}", host))
}

/// Host part of a configured site URL, `site_url` itself if it does not parse.
pub(crate) fn host_of(site_url: &str) -> String {
    Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| site_url.to_string())
}

/// Folds the "no data" outcomes of a request into `None`: the service
/// answering 404 and a body that is not JSON. Every other failure is
/// propagated.
pub(crate) fn optional(prefix: &str, res: Result<Value>) -> Result<Option<Value>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(Error::ResponseParseFailed(e)) => {
            warn!("{}: unreadable response ({})", prefix, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Deserializes `value`, logging and discarding payloads of the wrong shape.
pub(crate) fn decode<T>(prefix: &str, value: Value) -> Option<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_value::<T>(value) {
        Ok(res) => Some(res),
        Err(e) => {
            warn!("{}: malformed response ({})", prefix, e);
            None
        }
    }
}
