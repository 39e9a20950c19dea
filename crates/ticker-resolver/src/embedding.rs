use async_trait::async_trait;

/// Semantic nearest-neighbor search over the universe's official names.
/// The production system behind this interface is a Korean sentence
/// embedding model plus a vector index — both external collaborators not
/// specified here. This trait is the seam the disambiguator depends on.
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Returns up to `k` (name, similarity) pairs, most similar first.
    async fn nearest(&self, text: &str, k: usize) -> Vec<(String, f64)>;
}

const DIMS: usize = 256;

fn hash_embed(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0f32; dims];
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vector;
    }
    let window_len = if chars.len() >= 2 { 2 } else { 1 };
    for window in chars.windows(window_len) {
        let gram: String = window.iter().collect();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::hash::Hash::hash(&gram, &mut hasher);
        let bucket = (std::hash::Hasher::finish(&hasher) as usize) % dims;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot as f64
}

/// Default in-process `EmbeddingIndex`: a deterministic character-bigram
/// hashing embedder with cosine search over a precomputed name corpus.
/// Stands in for the real sentence-embedding model in tests and in any
/// deployment that has not wired a production embedding service behind
/// this trait.
pub struct CosineEmbeddingIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl CosineEmbeddingIndex {
    pub fn build(names: Vec<String>) -> Self {
        let entries = names
            .into_iter()
            .map(|name| {
                let vector = hash_embed(&name, DIMS);
                (name, vector)
            })
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl EmbeddingIndex for CosineEmbeddingIndex {
    async fn nearest(&self, text: &str, k: usize) -> Vec<(String, f64)> {
        let query = hash_embed(text, DIMS);
        let mut scored: Vec<(String, f64)> = self
            .entries
            .iter()
            .map(|(name, vector)| (name.clone(), cosine_similarity(&query, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exact_name_is_its_own_nearest_neighbor() {
        let index = CosineEmbeddingIndex::build(vec!["삼성전자".to_string(), "카카오".to_string()]);
        let results = index.nearest("삼성전자", 1).await;
        assert_eq!(results[0].0, "삼성전자");
        assert!(results[0].1 > 0.99);
    }
}
