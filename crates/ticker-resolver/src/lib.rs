pub mod disambiguator;
pub mod embedding;
pub mod error;

pub use disambiguator::{DisambiguatorConfig, TickerDisambiguator};
pub use embedding::{CosineEmbeddingIndex, EmbeddingIndex};
pub use error::{DisambiguatorError, DisambiguatorResult};
