use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisambiguatorError {
    #[error("ambiguous ticker '{alias}'")]
    AmbiguousTicker {
        alias: String,
        candidates: Vec<String>,
    },

    #[error("no candidates found for '{0}'")]
    NoCandidates(String),
}

pub type DisambiguatorResult<T> = Result<T, DisambiguatorError>;
