use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to build http client: {0}")]
    ClientBuildFailed(#[source] reqwest::Error),

    #[error("failed to send request: {0}")]
    SendRequestFailed(#[source] reqwest::Error),
    #[error("request failed with status {0}")]
    RequestFailed(u16),
    #[error("failed to parse response: {0}")]
    ResponseParseFailed(String),

    #[error("source '{0}' is not supported")]
    UnsupportedSource(String),
    #[error("operation was cancelled")]
    Cancelled,

    #[error("failed to read config {0:?}: {1}")]
    ConfigRead(PathBuf, #[source] std::io::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(#[source] toml::de::Error),
}

impl Error {
    /// The remote service answered but reported that the item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RequestFailed(404))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
