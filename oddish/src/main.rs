use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use tangela::{
    Aggregator, CancelToken, Config, MemoryStore, PageRequest, Registry,
    Resolver, Source, SourceSelection,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file, defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search one source or all of them
    Search {
        query: String,

        /// Source key or "all"
        #[arg(short, long, default_value = "all")]
        source: SourceSelection,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    Details {
        slug: String,

        #[arg(short, long)]
        source: Option<String>,
    },

    Chapters {
        slug: String,

        #[arg(short, long)]
        source: Option<String>,

        /// Give up listing after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Page image URLs of a chapter reference
    Pages {
        reference: String,

        #[arg(short, long)]
        source: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        volume: Option<u32>,

        #[arg(long)]
        number: Option<f64>,
    },

    /// Show which source a slug belongs to
    Resolve {
        slug: String,

        /// Canonical web URL known for the slug
        #[arg(short, long)]
        url: Option<String>,
    },

    /// List registered sources
    Sources,
}

fn print_json<T>(value: &T) -> bool
where
    T: Serialize,
{
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            true
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            false
        }
    }
}

struct App {
    config: Config,
    registry: Registry,
    store: MemoryStore,
}

impl App {
    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry, &self.store, &self.config.primary_source)
    }

    /// The explicitly requested source, or the one the resolver picks for
    /// `slug`.
    fn source_for(
        &self,
        key: Option<&str>,
        slug: &str,
    ) -> tangela::Result<&dyn Source> {
        match key {
            Some(key) => self.registry.require(key),
            None => {
                let resolution = self.resolver().resolve(slug);
                info!(
                    "Using '{}' for '{}' ({:?})",
                    resolution.source, slug, resolution.resolved_by
                );
                self.registry.require(&resolution.source)
            }
        }
    }

    /// Source for a chapter reference: the explicit one, the one whose web
    /// host the reference points at, or the slug's resolved source.
    fn source_for_reference(
        &self,
        key: Option<&str>,
        reference: &str,
        slug: Option<&str>,
    ) -> tangela::Result<&dyn Source> {
        if key.is_none() {
            if let Some(source) = self.registry.iter().find(|s| s.owns_url(reference)) {
                return Ok(source);
            }
        }

        match slug {
            Some(slug) => self.source_for(key, slug),
            None => self
                .registry
                .require(key.unwrap_or(&self.config.primary_source)),
        }
    }

    fn run(&self, command: Commands) -> tangela::Result<bool> {
        let ok = match command {
            Commands::Search {
                query,
                source,
                limit,
            } => {
                let limit = limit.unwrap_or(self.config.search_limit);
                let groups =
                    Aggregator::new(&self.registry).search(&query, limit, &source)?;
                print_json(&groups)
            }

            Commands::Details { slug, source } => {
                let source = self.source_for(source.as_deref(), &slug)?;
                match source.get_manga_details(&slug)? {
                    Some(details) => print_json(&details),
                    None => {
                        error!("'{}' was not found on '{}'", slug, source.key());
                        false
                    }
                }
            }

            Commands::Chapters {
                slug,
                source,
                timeout,
            } => {
                let source = self.source_for(source.as_deref(), &slug)?;
                let cancel = match timeout {
                    Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
                    None => CancelToken::new(),
                };

                let chapters = source.get_chapters(&slug, &cancel)?;
                print_json(&chapters)
            }

            Commands::Pages {
                reference,
                source,
                slug,
                volume,
                number,
            } => {
                let source = self.source_for_reference(
                    source.as_deref(),
                    &reference,
                    slug.as_deref(),
                )?;

                let request = PageRequest {
                    reference,
                    manga_slug: slug,
                    volume,
                    number,
                };
                let pages = source.get_pages(&request)?;
                print_json(&pages)
            }

            Commands::Resolve { slug, url } => {
                if let Some(url) = url {
                    self.store.set_canonical_url(&slug, &url);
                }

                print_json(&self.resolver().resolve(&slug))
            }

            Commands::Sources => print_json(&self.registry.keys()),
        };

        Ok(ok)
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let config = match Config::load_or_default(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = match Registry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to set up sources: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = App {
        config,
        registry,
        store: MemoryStore::new(),
    };

    match app.run(args.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
