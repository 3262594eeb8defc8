use thiserror::Error as ThisError;

/// Why a single symbol could not be retrieved. None of these abort a run.
#[derive(ThisError, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Rate limited (status {0})")]
    RateLimited(u16),

    #[error("No data returned")]
    EmptyData,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl FetchError {
    /// Maps a non-success HTTP status to the matching variant.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            code @ (418 | 429) => FetchError::RateLimited(code),
            code => FetchError::Status(code),
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
