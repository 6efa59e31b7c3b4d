//! Dense-vector similarity search.
//!
//! Two independent stores behind one capability trait: whole-document
//! vectors and per-chunk vectors. Chunked search collapses to the best
//! chunk per parent document, which is its own aggregation algorithm, not
//! a refinement of the document store. Both scan linearly; at this corpus
//! scale approximate structures buy nothing.

use crate::chunk::{self, ChunkMeta};
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::index::{DocId, Document};
use crate::persist::{self, IndexPaths};
use crate::providers::EmbeddingProvider;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A semantic search hit, at document granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHit {
    pub doc_id: DocId,
    pub score: f32,
    pub title: String,
    pub description: String,
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Shared capability of the two vector stores.
pub trait VectorSearch {
    /// Embed arbitrary text via the store's provider. Blank text is a
    /// usage error.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Rank stored units against the query, best first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SemanticHit>>;
}

/// One embedding vector per document, embedded from "title: description".
pub struct DocumentVectorStore<P> {
    provider: P,
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
    parallel: bool,
}

impl<P: EmbeddingProvider> DocumentVectorStore<P> {
    /// Embed the whole corpus and persist the vector array.
    pub fn build(provider: P, documents: &[Document], paths: &IndexPaths, config: &SearchConfig) -> Result<Self> {
        let texts: Vec<String> = documents.iter().map(Document::embedding_text).collect();
        let embeddings = provider.embed_batch(&texts)?;
        persist::write_artifact(&paths.embeddings(), &embeddings)?;
        tracing::info!(vectors = embeddings.len(), "built document embeddings");
        Ok(Self {
            provider,
            documents: documents.to_vec(),
            embeddings,
            parallel: config.parallel,
        })
    }

    /// Load the persisted vector array, insisting that it still matches
    /// the corpus one-to-one.
    pub fn load(provider: P, documents: &[Document], paths: &IndexPaths, config: &SearchConfig) -> Result<Self> {
        let embeddings: Vec<Vec<f32>> = persist::read_artifact("embeddings", &paths.embeddings())?;
        if embeddings.len() != documents.len() {
            return Err(SearchError::CorpusSizeMismatch {
                stored: embeddings.len(),
                expected: documents.len(),
            });
        }
        Ok(Self {
            provider,
            documents: documents.to_vec(),
            embeddings,
            parallel: config.parallel,
        })
    }

    /// Reuse the persisted store when it matches the corpus; rebuild from
    /// scratch when it is absent or stale.
    pub fn load_or_build(
        provider: P,
        documents: &[Document],
        paths: &IndexPaths,
        config: &SearchConfig,
    ) -> Result<Self>
    where
        P: Clone,
    {
        match Self::load(provider.clone(), documents, paths, config) {
            Ok(store) => Ok(store),
            Err(SearchError::MissingArtifact { name, .. }) => {
                tracing::info!(artifact = name, "no persisted embeddings, building");
                Self::build(provider, documents, paths, config)
            }
            Err(SearchError::CorpusSizeMismatch { stored, expected }) => {
                tracing::info!(stored, expected, "embedding count drifted, rebuilding");
                Self::build(provider, documents, paths, config)
            }
            Err(e) => Err(e),
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

impl<P: EmbeddingProvider> VectorSearch for DocumentVectorStore<P> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(SearchError::EmptyInput);
        }
        self.provider.embed(text)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        let query_vec = self.embed(query)?;
        let mut scored = score_rows(&self.embeddings, &query_vec, self.parallel);
        // Descending score, document order as tiebreak.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        Ok(scored
            .into_iter()
            .map(|(row, score)| {
                let doc = &self.documents[row];
                SemanticHit {
                    doc_id: doc.id,
                    score,
                    title: doc.title.clone(),
                    description: doc.description.clone(),
                }
            })
            .collect())
    }
}

/// One embedding vector per semantic chunk, with parallel provenance
/// metadata mapping each row back to its parent document.
pub struct ChunkVectorStore<P> {
    provider: P,
    documents: BTreeMap<DocId, Document>,
    chunks: Vec<ChunkMeta>,
    embeddings: Vec<Vec<f32>>,
    parallel: bool,
}

impl<P: EmbeddingProvider> ChunkVectorStore<P> {
    /// Chunk every document description, embed each chunk, and persist the
    /// vector array plus its metadata table.
    pub fn build(provider: P, documents: &[Document], paths: &IndexPaths, config: &SearchConfig) -> Result<Self> {
        let mut texts = Vec::new();
        let mut chunks = Vec::new();
        for doc in documents {
            let pieces = chunk::semantic_chunk(
                &doc.description,
                config.max_sentences,
                config.sentence_overlap,
            );
            let total = pieces.len();
            for (i, text) in pieces.into_iter().enumerate() {
                chunks.push(ChunkMeta {
                    doc_id: doc.id,
                    chunk_index: i + 1,
                    total_chunks: total,
                });
                texts.push(text);
            }
        }
        let embeddings = provider.embed_batch(&texts)?;
        persist::write_artifact(&paths.chunk_embeddings(), &embeddings)?;
        persist::write_artifact(&paths.chunk_meta(), &chunks)?;
        tracing::info!(
            docs = documents.len(),
            chunks = chunks.len(),
            "built chunk embeddings"
        );
        Ok(Self {
            provider,
            documents: documents.iter().map(|d| (d.id, d.clone())).collect(),
            chunks,
            embeddings,
            parallel: config.parallel,
        })
    }

    pub fn load(provider: P, documents: &[Document], paths: &IndexPaths, config: &SearchConfig) -> Result<Self> {
        let embeddings: Vec<Vec<f32>> =
            persist::read_artifact("chunk embeddings", &paths.chunk_embeddings())?;
        let chunks: Vec<ChunkMeta> = persist::read_artifact("chunk metadata", &paths.chunk_meta())?;
        if embeddings.len() != chunks.len() {
            return Err(SearchError::CorpusSizeMismatch {
                stored: embeddings.len(),
                expected: chunks.len(),
            });
        }
        // Chunk counts are only reconstructable from the metadata, so the
        // corpus check is distinct-parent equality. A blank description
        // yields no chunks at all, so such documents are not expected
        // parents.
        let parents: BTreeSet<DocId> = chunks.iter().map(|c| c.doc_id).collect();
        let expected: BTreeSet<DocId> = documents
            .iter()
            .filter(|d| !d.description.trim().is_empty())
            .map(|d| d.id)
            .collect();
        if parents != expected {
            return Err(SearchError::CorpusSizeMismatch {
                stored: parents.len(),
                expected: expected.len(),
            });
        }
        Ok(Self {
            provider,
            documents: documents.iter().map(|d| (d.id, d.clone())).collect(),
            chunks,
            embeddings,
            parallel: config.parallel,
        })
    }

    pub fn load_or_build(
        provider: P,
        documents: &[Document],
        paths: &IndexPaths,
        config: &SearchConfig,
    ) -> Result<Self>
    where
        P: Clone,
    {
        match Self::load(provider.clone(), documents, paths, config) {
            Ok(store) => Ok(store),
            Err(SearchError::MissingArtifact { name, .. }) => {
                tracing::info!(artifact = name, "no persisted chunk store, building");
                Self::build(provider, documents, paths, config)
            }
            Err(SearchError::CorpusSizeMismatch { stored, expected }) => {
                tracing::info!(stored, expected, "chunk store drifted, rebuilding");
                Self::build(provider, documents, paths, config)
            }
            Err(e) => Err(e),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Rank chunks against the query, then collapse to one entry per
    /// parent document keeping the maximum chunk score.
    pub fn search_chunks(&self, query: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        let query_vec = self.embed(query)?;
        let scored = score_rows(&self.embeddings, &query_vec, self.parallel);

        let mut best: HashMap<DocId, f32> = HashMap::new();
        for (row, score) in scored {
            let doc_id = self.chunks[row].doc_id;
            let entry = best.entry(doc_id).or_insert(f32::NEG_INFINITY);
            if score > *entry {
                *entry = score;
            }
        }

        let mut collapsed: Vec<(DocId, f32)> = best.into_iter().collect();
        collapsed.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        collapsed.truncate(limit);
        Ok(collapsed
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.documents.get(&doc_id).map(|doc| SemanticHit {
                    doc_id,
                    score,
                    title: doc.title.clone(),
                    description: doc.description.clone(),
                })
            })
            .collect())
    }
}

impl<P: EmbeddingProvider> VectorSearch for ChunkVectorStore<P> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(SearchError::EmptyInput);
        }
        self.provider.embed(text)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        self.search_chunks(query, limit)
    }
}

fn score_rows(embeddings: &[Vec<f32>], query: &[f32], parallel: bool) -> Vec<(usize, f32)> {
    if parallel {
        embeddings
            .par_iter()
            .enumerate()
            .map(|(row, v)| (row, cosine_similarity(v, query)))
            .collect()
    } else {
        embeddings
            .iter()
            .enumerate()
            .map(|(row, v)| (row, cosine_similarity(v, query)))
            .collect()
    }
}
