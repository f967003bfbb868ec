pub use aggregate::{Aggregator, SourceSelection};
pub use cancel::CancelToken;
pub use config::Config;
pub use error::{Error, Result};
pub use model::*;
pub use registry::Registry;
pub use resolver::{MemoryStore, Resolution, ResolvedBy, Resolver, SourceStore};
pub use source::Source;
pub use transport::{HttpTransport, Transport};

pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod sources;
pub mod transport;
pub mod util;
