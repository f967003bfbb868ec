use std::str::FromStr;
use std::thread;

use log::{debug, error, info};

use crate::error::Result;
use crate::model::SourceResults;
use crate::registry::Registry;
use crate::source::Source;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum SourceSelection {
    #[default]
    All,
    Only(String),
}

impl FromStr for SourceSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(SourceSelection::All)
        } else {
            Ok(SourceSelection::Only(s.to_ascii_lowercase()))
        }
    }
}

/// Runs one search across several sources at once.
pub struct Aggregator<'a> {
    registry: &'a Registry,
}

impl<'a> Aggregator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    fn selected(&self, selection: &SourceSelection) -> Result<Vec<&'a dyn Source>> {
        let registry: &'a Registry = self.registry;

        match selection {
            SourceSelection::All => Ok(registry.iter().collect()),
            SourceSelection::Only(key) => Ok(vec![registry.require(key)?]),
        }
    }

    /// One group per selected source, in registry order. A source that fails
    /// (or panics) yields an empty group carrying the error instead of
    /// affecting the others.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        selection: &SourceSelection,
    ) -> Result<Vec<SourceResults>> {
        debug!("search('{}', {}, {:?})", query, limit, selection);

        let sources = self.selected(selection)?;

        let groups = thread::scope(|scope| {
            let handles = sources
                .iter()
                .map(|source| {
                    let source = *source;
                    let handle = scope.spawn(move || search_one(source, query, limit));
                    (source.key(), handle)
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|(key, handle)| match handle.join() {
                    Ok(group) => group,
                    Err(_) => {
                        error!("Search on '{}' panicked", key);
                        SourceResults::failed(key, format!("search on '{}' panicked", key))
                    }
                })
                .collect::<Vec<_>>()
        });

        let total = groups.iter().map(|g| g.items.len()).sum::<usize>();
        info!(
            "Search '{}' returned {} results from {} sources",
            query,
            total,
            groups.len()
        );

        Ok(groups)
    }
}

fn search_one(source: &dyn Source, query: &str, limit: usize) -> SourceResults {
    let key = source.key();

    match source.search(query, limit) {
        Ok(mut items) => {
            items.truncate(limit);
            for item in items.iter_mut() {
                item.source = key.to_string();
            }

            SourceResults {
                source: key.to_string(),
                items,
                error: None,
            }
        }

        Err(e) => {
            error!("Search on '{}' failed: {}", key, e);
            SourceResults::failed(key, e.to_string())
        }
    }
}
