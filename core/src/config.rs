//! Engine defaults and the runtime configuration object.

use std::path::{Path, PathBuf};

/// BM25 term-frequency saturation.
pub const DEFAULT_BM25_K1: f32 = 1.5;
/// BM25 length normalization.
pub const DEFAULT_BM25_B: f32 = 0.75;
/// Keyword weight in weighted fusion; the semantic side gets `1 - alpha`.
pub const DEFAULT_ALPHA: f32 = 0.5;
/// Rank-smoothing constant for Reciprocal Rank Fusion.
pub const DEFAULT_RRF_K: f32 = 60.0;
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Sub-ranking oversampling multiple applied to `limit` before fusing.
pub const DEFAULT_FUSION_DEPTH: usize = 500;
/// Sentences per chunk in sentence-bounded chunking.
pub const DEFAULT_MAX_SENTENCES: usize = 4;
/// Sentences shared between consecutive chunks.
pub const DEFAULT_SENTENCE_OVERLAP: usize = 1;
/// Output width of the built-in hashing embedder.
pub const DEFAULT_EMBEDDING_DIM: usize = 256;

/// Tuning knobs and cache location for one engine instance. Construct with
/// [`SearchConfig::with_cache_dir`] and override fields as needed.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Directory holding the persisted index and embedding artifacts.
    pub cache_dir: PathBuf,
    pub k1: f32,
    pub b: f32,
    pub fusion_depth: usize,
    pub max_sentences: usize,
    pub sentence_overlap: usize,
    pub embedding_dim: usize,
    /// Score documents and embedding rows with a parallel map.
    pub parallel: bool,
}

impl SearchConfig {
    pub fn with_cache_dir<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            k1: DEFAULT_BM25_K1,
            b: DEFAULT_BM25_B,
            fusion_depth: DEFAULT_FUSION_DEPTH,
            max_sentences: DEFAULT_MAX_SENTENCES,
            sentence_overlap: DEFAULT_SENTENCE_OVERLAP,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            parallel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_cache_dir_keeps_defaults() {
        let config = SearchConfig::with_cache_dir("/tmp/rf");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/rf"));
        assert_eq!(config.k1, DEFAULT_BM25_K1);
        assert_eq!(config.b, DEFAULT_BM25_B);
        assert!(!config.parallel);
    }
}
