//! Hybrid search facade.
//!
//! Owns the inverted index and both vector stores, loading or building
//! their persisted artifacts on open, and exposes the engine's five query
//! entry points. Every entry point returns the same ordered record shape,
//! so presentation layers handle one result type.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::fusion::{self, FusedScore};
use crate::index::{Bm25Hit, DocId, Document, InvertedIndex};
use crate::persist::IndexPaths;
use crate::providers::EmbeddingProvider;
use crate::vector::{ChunkVectorStore, DocumentVectorStore, SemanticHit, VectorSearch};

/// One ranked search result. Insertion order within the returned vector is
/// the final rank order (descending fused score).
///
/// For fused searches, `keyword_score` and `semantic_score` hold what the
/// strategy consumed (raw sub-ranking scores for weighted fusion, rank
/// positions for RRF); for single-ranking entry points the other side is
/// zero and `fused_score` equals the single score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub doc_id: DocId,
    pub keyword_score: f32,
    pub semantic_score: f32,
    pub fused_score: f32,
    pub title: String,
    pub description: String,
}

pub struct HybridSearch<P> {
    index: InvertedIndex,
    doc_vectors: DocumentVectorStore<P>,
    chunk_vectors: ChunkVectorStore<P>,
    config: SearchConfig,
}

impl<P: EmbeddingProvider + Clone> HybridSearch<P> {
    /// Load every persisted artifact under the configured cache directory,
    /// rebuilding whatever is missing or stale for this corpus.
    pub fn open(documents: &[Document], provider: P, config: SearchConfig) -> Result<Self> {
        let paths = IndexPaths::new(&config.cache_dir);
        let index = match InvertedIndex::load(&paths) {
            Ok(index) if index.len() == documents.len() => index,
            Ok(index) => {
                tracing::info!(
                    stored = index.len(),
                    expected = documents.len(),
                    "index corpus drifted, rebuilding"
                );
                let index = InvertedIndex::build(documents);
                index.save(&paths)?;
                index
            }
            Err(SearchError::MissingArtifact { name, .. }) => {
                tracing::info!(artifact = name, "no persisted index, building");
                let index = InvertedIndex::build(documents);
                index.save(&paths)?;
                index
            }
            Err(SearchError::VersionMismatch { found, expected }) => {
                tracing::info!(found, expected, "index format changed, rebuilding");
                let index = InvertedIndex::build(documents);
                index.save(&paths)?;
                index
            }
            Err(e) => return Err(e),
        };
        let doc_vectors =
            DocumentVectorStore::load_or_build(provider.clone(), documents, &paths, &config)?;
        let chunk_vectors = ChunkVectorStore::load_or_build(provider, documents, &paths, &config)?;
        Ok(Self {
            index,
            doc_vectors,
            chunk_vectors,
            config,
        })
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Lexical ranking only.
    pub fn bm25_search(&self, query: &str, limit: usize) -> Vec<RankedResult> {
        self.bm25_hits(query, limit)
            .into_iter()
            .map(|hit| self.keyword_result(hit))
            .collect()
    }

    /// Whole-document semantic ranking only.
    pub fn vector_search(&self, query: &str, limit: usize) -> Result<Vec<RankedResult>> {
        Ok(self
            .doc_vectors
            .search(query, limit)?
            .into_iter()
            .map(semantic_result)
            .collect())
    }

    /// Chunk-granularity semantic ranking, collapsed to parent documents.
    pub fn chunked_vector_search(&self, query: &str, limit: usize) -> Result<Vec<RankedResult>> {
        Ok(self
            .chunk_vectors
            .search_chunks(query, limit)?
            .into_iter()
            .map(semantic_result)
            .collect())
    }

    /// Weighted linear fusion of BM25 and chunked semantic rankings.
    ///
    /// Both sub-rankings are oversampled to `fusion_depth * limit` before
    /// merging, so a document ranked low on one side but high on the other
    /// still has a chance to surface in the top `limit`.
    pub fn weighted_hybrid_search(
        &self,
        query: &str,
        alpha: f32,
        limit: usize,
    ) -> Result<Vec<RankedResult>> {
        let (keyword, semantic) = self.sub_rankings(query, limit)?;
        let fused = fusion::weighted_fusion(&keyword, &semantic, alpha, limit);
        Ok(self.decorate(fused))
    }

    /// Reciprocal Rank Fusion of BM25 and chunked semantic rankings.
    pub fn rrf_hybrid_search(&self, query: &str, k: f32, limit: usize) -> Result<Vec<RankedResult>> {
        let (keyword, semantic) = self.sub_rankings(query, limit)?;
        let fused = fusion::rrf_fusion(&keyword, &semantic, k, limit);
        Ok(self.decorate(fused))
    }

    fn sub_rankings(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<(Vec<(DocId, f32)>, Vec<(DocId, f32)>)> {
        let depth = self.config.fusion_depth.saturating_mul(limit.max(1));
        let keyword = self
            .bm25_hits(query, depth)
            .into_iter()
            .map(|h| (h.doc_id, h.score))
            .collect();
        let semantic = self
            .chunk_vectors
            .search_chunks(query, depth)?
            .into_iter()
            .map(|h| (h.doc_id, h.score))
            .collect();
        Ok((keyword, semantic))
    }

    fn bm25_hits(&self, query: &str, limit: usize) -> Vec<Bm25Hit> {
        if self.config.parallel {
            self.index
                .par_search(query, limit, self.config.k1, self.config.b)
        } else {
            self.index
                .search(query, limit, self.config.k1, self.config.b)
        }
    }

    fn keyword_result(&self, hit: Bm25Hit) -> RankedResult {
        let description = self
            .index
            .document(hit.doc_id)
            .map(|d| d.description.clone())
            .unwrap_or_default();
        RankedResult {
            doc_id: hit.doc_id,
            keyword_score: hit.score,
            semantic_score: 0.0,
            fused_score: hit.score,
            title: hit.title,
            description,
        }
    }

    fn decorate(&self, fused: Vec<FusedScore>) -> Vec<RankedResult> {
        fused
            .into_iter()
            .map(|f| {
                let (title, description) = self
                    .index
                    .document(f.doc_id)
                    .map(|d| (d.title.clone(), d.description.clone()))
                    .unwrap_or_default();
                RankedResult {
                    doc_id: f.doc_id,
                    keyword_score: f.keyword,
                    semantic_score: f.semantic,
                    fused_score: f.fused,
                    title,
                    description,
                }
            })
            .collect()
    }
}

fn semantic_result(hit: SemanticHit) -> RankedResult {
    RankedResult {
        doc_id: hit.doc_id,
        keyword_score: 0.0,
        semantic_score: hit.score,
        fused_score: hit.score,
        title: hit.title,
        description: hit.description,
    }
}
