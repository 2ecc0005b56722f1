use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("invalid person URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no person container (#perso or #content) in {0}")]
    MissingContainer(String),

    #[error("page cache: {0}")]
    Cache(#[from] rusqlite::Error),
}

impl FetchError {
    /// Rate limiting and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            FetchError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}
