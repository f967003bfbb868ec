use log::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::source::Source;
use crate::sources::{Constructor, BUILTIN};

/// Source key -> adapter. Built once, never mutated afterwards.
pub struct Registry {
    sources: Vec<Box<dyn Source>>,
}

impl Registry {
    /// Later entries with an already registered key are dropped.
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        let mut res: Vec<Box<dyn Source>> = Vec::with_capacity(sources.len());

        for source in sources {
            if res.iter().any(|s| s.key().eq_ignore_ascii_case(source.key())) {
                warn!("Source '{}' registered twice, ignoring", source.key());
                continue;
            }

            res.push(source);
        }

        Self { sources: res }
    }

    pub fn from_constructors(
        config: &Config,
        constructors: &[(&str, Constructor)],
    ) -> Result<Self> {
        let mut sources = Vec::with_capacity(constructors.len());
        for (key, constructor) in constructors {
            debug!("Registering source '{}'", key);
            sources.push(constructor(config)?);
        }

        Ok(Self::new(sources))
    }

    /// Registry with every built-in source.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_constructors(config, BUILTIN)
    }

    /// Case-insensitive. `None` means the source is not supported.
    pub fn lookup(&self, key: &str) -> Option<&dyn Source> {
        let key = key.trim();
        self.sources
            .iter()
            .find(|s| s.key().eq_ignore_ascii_case(key))
            .map(|s| s.as_ref())
    }

    pub fn require(&self, key: &str) -> Result<&dyn Source> {
        self.lookup(key)
            .ok_or_else(|| Error::UnsupportedSource(key.to_string()))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.key()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sources_are_registered_in_order() {
        let registry = Registry::from_config(&Config::default()).unwrap();

        assert_eq!(registry.keys(), vec!["mangalib", "senkuro"]);
        assert_eq!(registry.lookup("SenKuro").map(|s| s.key()), Some("senkuro"));
        assert!(registry.lookup("mangahub").is_none());
        assert!(matches!(
            registry.require("mangahub"),
            Err(Error::UnsupportedSource(key)) if key == "mangahub"
        ));
    }
}
