use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::registry::Registry;
use crate::source::Source;

/// What the persistence layer knows about catalog items.
pub trait SourceStore {
    /// Source previously recorded for `slug`.
    fn source_for(&self, slug: &str) -> Option<String>;
    /// Canonical web URL on record for `slug`.
    fn canonical_url(&self, slug: &str) -> Option<String>;
    fn remember(&self, slug: &str, source: &str);
}

#[derive(Default, Clone, Debug)]
struct StoreEntry {
    source: Option<String>,
    url: Option<String>,
}

/// `SourceStore` kept in process memory.
#[derive(Default, Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoreEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Option<MutexGuard<'_, HashMap<String, StoreEntry>>> {
        match self.entries.lock() {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!("Source store lock is poisoned, ignoring it: {}", e);
                None
            }
        }
    }

    pub fn set_canonical_url(&self, slug: &str, url: &str) {
        if let Some(mut lock) = self.entries() {
            lock.entry(slug.to_string()).or_default().url = Some(url.to_string());
        }
    }
}

impl SourceStore for MemoryStore {
    fn source_for(&self, slug: &str) -> Option<String> {
        self.entries()?.get(slug).and_then(|e| e.source.clone())
    }

    fn canonical_url(&self, slug: &str) -> Option<String> {
        self.entries()?.get(slug).and_then(|e| e.url.clone())
    }

    fn remember(&self, slug: &str, source: &str) {
        if let Some(mut lock) = self.entries() {
            lock.entry(slug.to_string()).or_default().source = Some(source.to_string());
        }
    }
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub enum ResolvedBy {
    Recorded,
    UrlPattern,
    Probed,
    Default,
}

#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct Resolution {
    pub source: String,
    #[serde(rename = "resolvedBy")]
    pub resolved_by: ResolvedBy,
}

/// Finds which source a slug of unknown origin belongs to. Never fails:
/// when nothing else works the primary source is returned.
pub struct Resolver<'a> {
    registry: &'a Registry,
    store: &'a dyn SourceStore,
    primary: String,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry, store: &'a dyn SourceStore, primary: &str) -> Self {
        if registry.lookup(primary).is_none() {
            warn!("Primary source '{}' is not registered", primary);
        }

        Self {
            registry,
            store,
            primary: primary.trim().to_ascii_lowercase(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Sources in probe order: the primary one first, then the rest in
    /// registry order.
    fn probe_order(&self) -> Vec<&'a dyn Source> {
        let registry: &'a Registry = self.registry;

        let mut order = Vec::with_capacity(registry.len());
        if let Some(primary) = registry.lookup(&self.primary) {
            order.push(primary);
        }

        for source in registry.iter() {
            if !source.key().eq_ignore_ascii_case(&self.primary) {
                order.push(source);
            }
        }

        order
    }

    pub fn resolve(&self, slug: &str) -> Resolution {
        debug!("resolve('{}')", slug);

        if let Some(source) = self.store.source_for(slug) {
            trace!("'{}' is recorded as '{}'", slug, source);
            return Resolution {
                source,
                resolved_by: ResolvedBy::Recorded,
            };
        }

        if let Some(url) = self.store.canonical_url(slug) {
            if let Some(source) = self.registry.iter().find(|s| s.owns_url(&url)) {
                info!("'{}' belongs to '{}' by its url {}", slug, source.key(), url);
                self.store.remember(slug, source.key());
                return Resolution {
                    source: source.key().to_string(),
                    resolved_by: ResolvedBy::UrlPattern,
                };
            }
        }

        for source in self.probe_order() {
            match source.get_manga_details(slug) {
                Ok(Some(_)) => {
                    info!("'{}' found on '{}'", slug, source.key());
                    self.store.remember(slug, source.key());
                    return Resolution {
                        source: source.key().to_string(),
                        resolved_by: ResolvedBy::Probed,
                    };
                }
                Ok(None) => trace!("'{}' not on '{}'", slug, source.key()),
                Err(e) => debug!("Probing '{}' for '{}' failed: {}", source.key(), slug, e),
            }
        }

        warn!(
            "Could not find '{}' on any source, defaulting to '{}'",
            slug, self.primary
        );
        Resolution {
            source: self.primary.clone(),
            resolved_by: ResolvedBy::Default,
        }
    }
}
