use std::fmt;
use thiserror::Error;

/// What a fatal fetch was trying to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Sprint,
    Issues,
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::Sprint => write!(f, "sprint detail"),
            FetchTarget::Issues => write!(f, "issue list"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to fetch {target} for sprint {sprint_id}: {source}")]
    Fetch {
        sprint_id: u64,
        target: FetchTarget,
        #[source]
        source: ProviderError,
    },

    #[error("report for sprint {sprint_id} timed out after {seconds}s")]
    Timeout { sprint_id: u64, seconds: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn fetch(sprint_id: u64, target: FetchTarget, source: ProviderError) -> Self {
        Self::Fetch {
            sprint_id,
            target,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
