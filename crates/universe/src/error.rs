use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog row in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

pub type UniverseResult<T> = Result<T, UniverseError>;
