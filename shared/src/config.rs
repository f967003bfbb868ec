use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Source the resolver falls back to and probes first
    pub primary_source: String,
    pub search_limit: usize,

    pub mangalib: MangaLibConfig,
    pub senkuro: SenkuroConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MangaLibConfig {
    pub api_url: String,
    pub site_url: String,
    pub image_host: String,
    pub site_id: u32,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SenkuroConfig {
    pub api_url: String,
    pub site_url: String,
    pub primary_locale: String,
    /// Hard ceiling on chapter list pages fetched per manga
    pub max_chapter_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            primary_source: "senkuro".to_string(),
            search_limit: 10,
            mangalib: MangaLibConfig::default(),
            senkuro: SenkuroConfig::default(),
        }
    }
}

impl Default for MangaLibConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.cdnlibs.org/api/manga/".to_string(),
            site_url: "https://mangalib.org".to_string(),
            image_host: "https://img2.imglib.info".to_string(),
            site_id: 1,
        }
    }
}

impl Default for SenkuroConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.senkuro.me/graphql".to_string(),
            site_url: "https://senkuro.me".to_string(),
            primary_locale: "RU".to_string(),
            max_chapter_pages: 100,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str::<Config>(s).map_err(Error::InvalidConfig)
    }

    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        debug!("Loading config from {:?}", path);

        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigRead(path.to_path_buf(), e))?;
        Self::from_toml(&s)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default<P>(path: Option<P>) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
