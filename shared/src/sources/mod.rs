use crate::config::Config;
use crate::error::Result;
use crate::source::Source;

pub mod mangalib;
pub mod senkuro;

pub use mangalib::MangaLib;
pub use senkuro::Senkuro;

pub type Constructor = fn(&Config) -> Result<Box<dyn Source>>;

fn mangalib(config: &Config) -> Result<Box<dyn Source>> {
    Ok(Box::new(MangaLib::from_config(config)?))
}

fn senkuro(config: &Config) -> Result<Box<dyn Source>> {
    Ok(Box::new(Senkuro::from_config(config)?))
}

/// Built-in sources in registry order.
pub const BUILTIN: &[(&str, Constructor)] =
    &[(MangaLib::KEY, mangalib), (Senkuro::KEY, senkuro)];
