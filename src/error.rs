use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API request failed with status {status}: {body}")]
    UpstreamRequest { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("Cannot build a report from zero analyses")]
    EmptyInput,

    #[error("Rate limit exceeded, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited(_) | Error::Network(_) => true,
            Error::UpstreamRequest { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
