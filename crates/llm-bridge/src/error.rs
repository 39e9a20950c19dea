use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to completion service failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type LlmResult<T> = Result<T, LlmError>;
