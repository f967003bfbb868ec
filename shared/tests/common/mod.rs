#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tangela::{
    CancelToken, ChapterList, ChapterSummary, Error, MangaDetails, PageList,
    PageRequest, Result, SearchResultItem, Source, Transport,
};

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value> + Send + Sync>;

/// Scripted transport. GET routes match on URL prefix, POST routes on the
/// exact GraphQL `operationName`. Unrouted calls answer 404.
#[derive(Clone, Default)]
pub struct StubTransport {
    routes: Arc<Mutex<Vec<(String, Handler)>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F>(self, key: &str, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap()
            .push((key.to_string(), Box::new(handler)));
        self
    }

    pub fn reply(self, key: &str, value: Value) -> Self {
        self.route(key, move |_, _| Ok(value.clone()))
    }

    /// URLs (GET) and operation names (POST) seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn dispatch(&self, key: &str, prefix: bool, url: &str, body: &Value) -> Result<Value> {
        self.calls.lock().unwrap().push(key.to_string());

        let routes = self.routes.lock().unwrap();
        let found = routes.iter().find(|(route, _)| {
            if prefix {
                key.starts_with(route.as_str())
            } else {
                key == route.as_str()
            }
        });

        match found {
            Some((_, handler)) => handler(url, body),
            None => Err(Error::RequestFailed(404)),
        }
    }
}

impl Transport for StubTransport {
    fn get(&self, url: &str) -> Result<Value> {
        self.dispatch(url, true, url, &Value::Null)
    }

    fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let operation = body["operationName"].as_str().unwrap_or_default().to_string();
        self.dispatch(&operation, false, url, body)
    }
}

/// In-memory source with a fixed catalog and failure switches.
pub struct FakeSource {
    pub key: &'static str,
    pub host: &'static str,
    pub slugs: Vec<&'static str>,
    pub fail: bool,
    pub panic: bool,
    pub probes: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(key: &'static str, slugs: &[&'static str]) -> Self {
        Self {
            key,
            host: "",
            slugs: slugs.to_vec(),
            fail: false,
            panic: false,
            probes: Arc::default(),
        }
    }

    pub fn host(mut self, host: &'static str) -> Self {
        self.host = host;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn probe_counter(&self) -> Arc<AtomicUsize> {
        self.probes.clone()
    }

    fn item(&self, slug: &str) -> SearchResultItem {
        SearchResultItem {
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            // deliberately wrong, the aggregator restamps it
            source: "unknown".to_string(),
            ..Default::default()
        }
    }
}

impl Source for FakeSource {
    fn key(&self) -> &str {
        self.key
    }

    fn web_host(&self) -> &str {
        self.host
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>> {
        if self.panic {
            panic!("{} blew up", self.key);
        }
        if self.fail {
            return Err(Error::RequestFailed(503));
        }

        Ok(self
            .slugs
            .iter()
            .filter(|s| s.contains(query))
            .take(limit)
            .map(|s| self.item(s))
            .collect())
    }

    fn get_manga_details(&self, slug: &str) -> Result<Option<MangaDetails>> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(Error::RequestFailed(503));
        }

        let known = self.slugs.iter().any(|s| *s == slug);
        Ok(known.then(|| MangaDetails {
            item: self.item(slug),
            ..Default::default()
        }))
    }

    fn get_chapters(&self, _slug: &str, _cancel: &CancelToken) -> Result<ChapterList> {
        Ok(ChapterList::complete(Vec::<ChapterSummary>::new()))
    }

    fn get_pages(&self, _request: &PageRequest) -> Result<PageList> {
        Ok(Vec::new())
    }
}
