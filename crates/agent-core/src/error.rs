use chrono::NaiveDate;
use thiserror::Error;

/// Shared error taxonomy for the core domain. Component-specific errors
/// (`ticker-resolver`, `llm-bridge`, `analytics-engine`) convert into this
/// type at the router boundary via `#[from]`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no data available for {0}")]
    DataUnavailable(NaiveDate),

    #[error("{0} is not a trading day")]
    NonTradingDay(NaiveDate),

    #[error("ambiguous ticker '{alias}'")]
    AmbiguousTicker {
        alias: String,
        candidates: Vec<String>,
    },

    #[error("could not parse the question")]
    ParseFailure,

    #[error("session store error: {0}")]
    SessionStore(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
