/// Core error type.
///
/// Adapter crates map their specific failures into this type so the bot can
/// decide between a user-facing message and a generic failure reply.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("all shorteners failed after {attempts} attempt(s)")]
    AllProvidersFailed { attempts: usize },

    #[error("not authorized")]
    Unauthorized,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Store(e.to_string())
    }
}

/// Failure of a single call to a single shortening provider.
///
/// Recovered locally by the rotation controller and the bulk job; never shown
/// to end users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected http status {0}")]
    HttpStatus(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider rejected request (status {status:?})")]
    Rejected { status: Option<i64> },
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries provider credentials in its query string.
        let e = e.without_url();
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = e.status() {
            return ProviderError::HttpStatus(status.as_u16());
        }
        if e.is_decode() {
            return ProviderError::Malformed(e.to_string());
        }
        ProviderError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
