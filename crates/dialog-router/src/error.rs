use agent_core::CoreError;
use chrono::NaiveDate;
use ticker_resolver::DisambiguatorError;
use thiserror::Error;

/// Composes the per-component error enums. Carries `AmbiguousTicker` as
/// structured data (not a string) so the router can re-prompt without
/// losing the rest of the pending session.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("ambiguous ticker '{alias}'")]
    AmbiguousTicker { alias: String, candidates: Vec<String> },

    #[error("{0} is not a trading day")]
    NonTradingDay(NaiveDate),

    #[error("could not understand the question")]
    ParseFailure,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DisambiguatorError> for RouterError {
    fn from(err: DisambiguatorError) -> Self {
        match err {
            DisambiguatorError::AmbiguousTicker { alias, candidates } => {
                RouterError::AmbiguousTicker { alias, candidates }
            }
            DisambiguatorError::NoCandidates(alias) => RouterError::AmbiguousTicker {
                alias,
                candidates: Vec::new(),
            },
        }
    }
}

pub type RouterResult<T> = Result<T, RouterError>;
