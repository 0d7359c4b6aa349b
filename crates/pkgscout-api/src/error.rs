use thiserror::Error;

/// Everything that can go wrong while talking to pkg.go.dev or GitHub
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("non-retryable transport error: {0}")]
    NonRetryableTransport(String),

    #[error("rate limited (status 429)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("server error: status {status}")]
    Server { status: u16 },

    #[error("client error: status {status}")]
    Client { status: u16 },

    #[error("exceeded retry limit after {attempts} attempts: {last}")]
    RetryLimitExceeded {
        attempts: u32,
        #[source]
        last: Box<ApiError>,
    },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// The repo (or package) simply isn't there - not worth shouting about
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::Client { status: 404 } | ApiError::UnexpectedStatus { status: 404, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
