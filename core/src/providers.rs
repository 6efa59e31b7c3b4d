//! Collaborator seams: embedding and text-generation providers.
//!
//! The engine treats the embedding model as an opaque text-to-vector
//! function and never calls the generator itself; RAG layers built on top
//! do. [`HashingEmbedder`] is a deterministic feature-hashing provider so
//! the engine runs and tests without a model runtime.

use crate::error::Result;
use crate::tokenizer;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps text to a fixed-length dense vector. Must be deterministic for
/// identical input within one provider instance.
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;
}

/// Maps a prompt to generated text. Used only by answer-synthesis layers
/// built atop the engine; the retrieval core never calls it.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Feature-hashing embedder: each normalized token is hashed into one of
/// `dimension` signed buckets and the result is L2-normalized. Crude as
/// semantics go, but deterministic, dependency-free, and sufficient for
/// exercising the vector-search and fusion paths end to end.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be positive");
        Self { dimension }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenizer::normalize(text) {
            // DefaultHasher::new() uses fixed keys, so bucket assignment
            // is stable across runs and instances.
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("a bear attacks the camp").unwrap();
        let b = embedder.embed("a bear attacks the camp").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embeddings_have_fixed_dimension_and_unit_norm() {
        let embedder = HashingEmbedder::new(32);
        let v = embedder.embed("space war beyond the planets").unwrap();
        assert_eq!(v.len(), 32);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn stopword_only_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed("the and of").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn batch_matches_single() {
        let embedder = HashingEmbedder::new(16);
        let texts = vec!["bear picnic".to_string(), "space war".to_string()];
        let batch = embedder.embed_batch(&texts).unwrap();
        assert_eq!(batch[0], embedder.embed("bear picnic").unwrap());
        assert_eq!(batch[1], embedder.embed("space war").unwrap());
    }
}
