use std::collections::HashMap;
use std::sync::Arc;

use llm_bridge::LlmBridge;
use tokio::sync::OnceCell;
use universe::UniverseCatalog;

use crate::embedding::{CosineEmbeddingIndex, EmbeddingIndex};
use crate::error::{DisambiguatorError, DisambiguatorResult};

const TRAILING_PARTICLES: &[char] = &['의', '은', '는', '이', '가', '를'];

fn strip_trailing_particle(identifier: &str) -> Option<String> {
    let mut chars = identifier.trim_end().chars();
    let last = chars.next_back()?;
    if TRAILING_PARTICLES.contains(&last) {
        let stripped: String = chars.collect();
        let stripped = stripped.trim_end().to_string();
        if stripped.is_empty() {
            None
        } else {
            Some(stripped)
        }
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisambiguatorConfig {
    pub fuzzy_top_k: usize,
    pub embed_top_k: usize,
    pub confidence_threshold: f64,
}

impl Default for DisambiguatorConfig {
    fn default() -> Self {
        Self {
            fuzzy_top_k: 3,
            embed_top_k: 3,
            confidence_threshold: 0.82,
        }
    }
}

/// Implements the five-stage pipeline from the specification: direct
/// lookup, fuzzy shortlist, semantic shortlist, LLM tie-break, confidence
/// gate. The embedding index is built lazily on first resolution and
/// guarded so concurrent first calls only build it once.
pub struct TickerDisambiguator {
    static_map: HashMap<String, String>,
    name_by_ticker: HashMap<String, String>,
    embedding_index: OnceCell<Arc<dyn EmbeddingIndex>>,
    official_names: Vec<String>,
    llm: Arc<dyn LlmBridge>,
    config: DisambiguatorConfig,
}

impl TickerDisambiguator {
    pub fn new(catalog: &UniverseCatalog, llm: Arc<dyn LlmBridge>, config: DisambiguatorConfig) -> Self {
        let mut static_map = catalog.name_map();
        for (alias, ticker) in catalog.alias_map() {
            static_map.entry(alias.clone()).or_insert_with(|| ticker.clone());
        }
        let name_by_ticker: HashMap<String, String> = static_map
            .iter()
            .map(|(name, ticker)| (ticker.clone(), name.clone()))
            .collect();
        let official_names: Vec<String> = static_map.keys().cloned().collect();

        Self {
            static_map,
            name_by_ticker,
            embedding_index: OnceCell::new(),
            official_names,
            llm,
            config,
        }
    }

    async fn embedding_index(&self) -> Arc<dyn EmbeddingIndex> {
        self.embedding_index
            .get_or_init(|| async {
                let index = CosineEmbeddingIndex::build(self.official_names.clone());
                Arc::new(index) as Arc<dyn EmbeddingIndex>
            })
            .await
            .clone()
    }

    fn fuzzy_shortlist(&self, alias: &str) -> Vec<(String, f64)> {
        let mut scored: Vec<(String, f64)> = self
            .static_map
            .keys()
            .map(|key| (key.clone(), strsim::normalized_levenshtein(alias, key)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.fuzzy_top_k);
        scored
    }

    /// Resolves a user-typed alias to `(ticker, official_name)`, or raises
    /// a structured `AmbiguousTicker` error the router converts into a
    /// re-prompt.
    pub async fn resolve(&self, alias: &str, api_key: &str) -> DisambiguatorResult<(String, String)> {
        if let Some(ticker) = self.static_map.get(alias) {
            let name = self.name_by_ticker.get(ticker).cloned().unwrap_or_else(|| alias.to_string());
            return Ok((ticker.clone(), name));
        }
        if let Some(stripped) = strip_trailing_particle(alias) {
            if let Some(ticker) = self.static_map.get(&stripped) {
                let name = self.name_by_ticker.get(ticker).cloned().unwrap_or(stripped);
                return Ok((ticker.clone(), name));
            }
        }

        let fuzzy = self.fuzzy_shortlist(alias);
        let embedding_index = self.embedding_index().await;
        let semantic = embedding_index.nearest(alias, self.config.embed_top_k).await;

        let mut merged: HashMap<String, f64> = HashMap::new();
        for (name, score) in fuzzy.into_iter().chain(semantic) {
            merged
                .entry(name)
                .and_modify(|existing| *existing = existing.max(score))
                .or_insert(score);
        }
        let mut candidates: Vec<(String, f64)> = merged.into_iter().collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(self.config.fuzzy_top_k + self.config.embed_top_k);

        if candidates.is_empty() {
            return Err(DisambiguatorError::NoCandidates(alias.to_string()));
        }
        let candidate_names: Vec<String> = candidates.into_iter().map(|(name, _)| name).collect();

        let (best, confidence) = self.llm.choose_alias(alias, &candidate_names, api_key).await;

        if confidence >= self.config.confidence_threshold {
            if let Some(ticker) = self.static_map.get(&best) {
                return Ok((ticker.clone(), best));
            }
        }

        tracing::warn!(%alias, confidence, "ticker disambiguation below confidence gate");
        Err(DisambiguatorError::AmbiguousTicker {
            alias: alias.to_string(),
            candidates: candidate_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_trailing_particles() {
        assert_eq!(strip_trailing_particle("삼성전자는"), Some("삼성전자".to_string()));
        assert_eq!(strip_trailing_particle("삼성전자"), None);
    }
}
