//! Inverted index and BM25 scoring.
//!
//! Terms map to posting lists of document IDs; per-document term
//! frequencies and token counts are kept alongside for BM25 length
//! normalization. The index is built once per corpus — construction goes
//! through [`InvertedIndex::build`], so a stale instance can never be
//! rebuilt in place.

use crate::error::{Result, SearchError};
use crate::persist::{self, IndexMeta, IndexPaths};
use crate::tokenizer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type DocId = u32;

/// A corpus document. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

impl Document {
    /// The text blob embedded for whole-document semantic search.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.title, self.description)
    }

    fn index_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// A BM25 search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Hit {
    pub doc_id: DocId,
    pub title: String,
    pub score: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, BTreeSet<DocId>>,
    docmap: BTreeMap<DocId, Document>,
    term_frequencies: HashMap<DocId, HashMap<String, u32>>,
    doc_lengths: HashMap<DocId, u32>,
    #[serde(skip)]
    avg_doc_len: f32,
}

impl InvertedIndex {
    /// Build a fresh index over the whole corpus.
    pub fn build(documents: &[Document]) -> Self {
        let mut index = Self::default();
        for doc in documents {
            index.add_document(doc);
        }
        index.avg_doc_len = average_length(&index.doc_lengths);
        tracing::info!(
            docs = index.docmap.len(),
            terms = index.postings.len(),
            "built inverted index"
        );
        index
    }

    fn add_document(&mut self, doc: &Document) {
        let terms = tokenizer::normalize(&doc.index_text());
        self.doc_lengths.insert(doc.id, terms.len() as u32);
        let tf = self.term_frequencies.entry(doc.id).or_default();
        for term in terms {
            *tf.entry(term.clone()).or_insert(0) += 1;
            self.postings.entry(term).or_default().insert(doc.id);
        }
        self.docmap.insert(doc.id, doc.clone());
    }

    pub fn len(&self) -> usize {
        self.docmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docmap.is_empty()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docmap.get(&doc_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docmap.values()
    }

    /// Mean token count over the corpus, cached at build/load time.
    /// 0.0 for an empty corpus.
    pub fn avg_doc_len(&self) -> f32 {
        self.avg_doc_len
    }

    /// Document IDs containing `term`, ascending and deduplicated.
    ///
    /// An unknown term yields an empty list; only a term that normalizes
    /// to more than one token is an error.
    pub fn get_postings(&self, term: &str) -> Result<Vec<DocId>> {
        let Some(term) = tokenizer::normalize_term(term)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .postings
            .get(&term)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Times `term` occurs in the given document; 0 when either is absent.
    pub fn term_frequency(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let Some(term) = tokenizer::normalize_term(term)? else {
            return Ok(0);
        };
        Ok(self
            .term_frequencies
            .get(&doc_id)
            .and_then(|tf| tf.get(&term))
            .copied()
            .unwrap_or(0))
    }

    /// BM25 inverse document frequency: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
    ///
    /// The `+ 1` keeps the argument above one, so the value is positive
    /// and finite for every df, including df = 0 and df = N. Strictly
    /// decreasing in df: ubiquitous terms approach `ln(1)` rather than
    /// going negative.
    pub fn bm25_idf(&self, term: &str) -> Result<f32> {
        let df = match tokenizer::normalize_term(term)? {
            Some(term) => self.postings.get(&term).map_or(0, BTreeSet::len),
            None => 0,
        } as f32;
        let n = self.docmap.len() as f32;
        Ok(((n - df + 0.5) / (df + 0.5) + 1.0).ln())
    }

    /// Length-normalized, saturating BM25 term-frequency component.
    pub fn bm25_tf(&self, doc_id: DocId, term: &str, k1: f32, b: f32) -> Result<f32> {
        let tf = self.term_frequency(doc_id, term)? as f32;
        Ok(self.bm25_tf_raw(doc_id, tf, k1, b))
    }

    fn bm25_tf_raw(&self, doc_id: DocId, tf: f32, k1: f32, b: f32) -> f32 {
        // Empty corpus: avg_doc_len is 0.0 and scoring short-circuits.
        if self.avg_doc_len == 0.0 {
            return 0.0;
        }
        let doc_len = self.doc_lengths.get(&doc_id).copied().unwrap_or(0) as f32;
        (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * (doc_len / self.avg_doc_len)))
    }

    /// Full BM25 score of one term for one document.
    pub fn bm25(&self, doc_id: DocId, term: &str, k1: f32, b: f32) -> Result<f32> {
        Ok(self.bm25_tf(doc_id, term, k1, b)? * self.bm25_idf(term)?)
    }

    /// Rank the whole corpus against `query` by summed BM25 over the query
    /// terms. Terms absent from a document contribute 0, not a penalty.
    /// Ties break by ascending document ID for determinism.
    pub fn search(&self, query: &str, limit: usize, k1: f32, b: f32) -> Vec<Bm25Hit> {
        let terms = tokenizer::normalize(query);
        let scored = self
            .docmap
            .keys()
            .map(|&id| (id, self.score_document(id, &terms, k1, b)))
            .collect();
        self.rank(scored, limit)
    }

    /// Parallel-map variant of [`search`](Self::search). The scored set is
    /// re-sorted before returning, so output never depends on worker
    /// completion order.
    pub fn par_search(&self, query: &str, limit: usize, k1: f32, b: f32) -> Vec<Bm25Hit> {
        let terms = tokenizer::normalize(query);
        let ids: Vec<DocId> = self.docmap.keys().copied().collect();
        let scored = ids
            .into_par_iter()
            .map(|id| (id, self.score_document(id, &terms, k1, b)))
            .collect();
        self.rank(scored, limit)
    }

    fn score_document(&self, doc_id: DocId, terms: &[String], k1: f32, b: f32) -> f32 {
        let tf_table = self.term_frequencies.get(&doc_id);
        terms
            .iter()
            .map(|term| {
                let tf = tf_table.and_then(|tf| tf.get(term)).copied().unwrap_or(0) as f32;
                let df = self.postings.get(term).map_or(0, BTreeSet::len) as f32;
                let n = self.docmap.len() as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                self.bm25_tf_raw(doc_id, tf, k1, b) * idf
            })
            .sum()
    }

    fn rank(&self, mut scored: Vec<(DocId, f32)>, limit: usize) -> Vec<Bm25Hit> {
        scored.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(limit);
        scored
            .into_iter()
            .map(|(doc_id, score)| Bm25Hit {
                doc_id,
                title: self
                    .docmap
                    .get(&doc_id)
                    .map(|d| d.title.clone())
                    .unwrap_or_default(),
                score,
            })
            .collect()
    }

    /// Persist postings, docmap, term frequencies, and document lengths as
    /// one logical unit under `paths`.
    pub fn save(&self, paths: &IndexPaths) -> Result<()> {
        persist::write_artifact(&paths.index(), &self.postings)?;
        persist::write_artifact(&paths.docmap(), &self.docmap)?;
        persist::write_artifact(&paths.term_frequencies(), &self.term_frequencies)?;
        persist::write_artifact(&paths.doc_lengths(), &self.doc_lengths)?;
        persist::write_meta(paths, &IndexMeta::now(self.docmap.len() as u32))?;
        tracing::info!(root = %paths.root().display(), "saved index artifacts");
        Ok(())
    }

    /// Restore a saved index. Fails with a distinct [`SearchError::MissingArtifact`]
    /// per absent blob so a partially built cache is diagnosable.
    pub fn load(paths: &IndexPaths) -> Result<Self> {
        let meta = persist::read_meta(paths)?;
        if meta.version != persist::INDEX_VERSION {
            return Err(SearchError::VersionMismatch {
                found: meta.version,
                expected: persist::INDEX_VERSION,
            });
        }
        let postings = persist::read_artifact("index", &paths.index())?;
        let docmap: BTreeMap<DocId, Document> = persist::read_artifact("docmap", &paths.docmap())?;
        let term_frequencies =
            persist::read_artifact("term frequencies", &paths.term_frequencies())?;
        let doc_lengths: HashMap<DocId, u32> =
            persist::read_artifact("document lengths", &paths.doc_lengths())?;
        let avg_doc_len = average_length(&doc_lengths);
        tracing::debug!(docs = docmap.len(), "loaded inverted index");
        Ok(Self {
            postings,
            docmap,
            term_frequencies,
            doc_lengths,
            avg_doc_len,
        })
    }
}

fn average_length(doc_lengths: &HashMap<DocId, u32>) -> f32 {
    if doc_lengths.is_empty() {
        return 0.0;
    }
    doc_lengths.values().map(|&l| l as u64).sum::<u64>() as f32 / doc_lengths.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document {
                id: 1,
                title: "Bear Attack".into(),
                description: "A bear attacks a small camp in the woods.".into(),
            },
            Document {
                id: 2,
                title: "Bear Picnic".into(),
                description: "Bears gather for a picnic by the river.".into(),
            },
            Document {
                id: 3,
                title: "Space War".into(),
                description: "Fleets clash beyond the outer planets.".into(),
            },
        ]
    }

    #[test]
    fn postings_sorted_and_unique() {
        let index = InvertedIndex::build(&corpus());
        let postings = index.get_postings("bear").unwrap();
        assert_eq!(postings, vec![1, 2]);
        let mut deduped = postings.clone();
        deduped.dedup();
        assert_eq!(deduped, postings);
    }

    #[test]
    fn unknown_term_is_not_an_error() {
        let index = InvertedIndex::build(&corpus());
        assert!(index.get_postings("zebra").unwrap().is_empty());
        assert_eq!(index.term_frequency(1, "zebra").unwrap(), 0);
        assert_eq!(index.term_frequency(99, "bear").unwrap(), 0);
    }

    #[test]
    fn multi_token_term_is_rejected() {
        let index = InvertedIndex::build(&corpus());
        assert!(matches!(
            index.get_postings("bear attack"),
            Err(SearchError::MultiTokenTerm { .. })
        ));
        assert!(matches!(
            index.term_frequency(1, "bear attack"),
            Err(SearchError::MultiTokenTerm { .. })
        ));
    }

    #[test]
    fn term_frequencies_sum_to_doc_length() {
        let index = InvertedIndex::build(&corpus());
        for doc in corpus() {
            let total: u32 = index.term_frequencies[&doc.id].values().sum();
            assert_eq!(total, index.doc_lengths[&doc.id]);
        }
    }

    #[test]
    fn idf_is_finite_at_both_extremes() {
        let index = InvertedIndex::build(&corpus());
        // df = 0
        assert!(index.bm25_idf("zebra").unwrap().is_finite());
        // "picnic" appears in one of three docs
        assert!(index.bm25_idf("picnic").unwrap() > 0.0);
    }

    #[test]
    fn idf_strictly_decreases_with_document_frequency() {
        let index = InvertedIndex::build(&corpus());
        let absent = index.bm25_idf("zebra").unwrap(); // df = 0
        let rare = index.bm25_idf("picnic").unwrap(); // df = 1
        let common = index.bm25_idf("bear").unwrap(); // df = 2
        assert!(absent > rare);
        assert!(rare > common);
        assert!(common > 0.0);
    }

    #[test]
    fn idf_stays_positive_for_ubiquitous_terms() {
        let docs: Vec<Document> = (1..=4)
            .map(|id| Document {
                id,
                title: "bear".into(),
                description: "bear".into(),
            })
            .collect();
        let index = InvertedIndex::build(&docs);
        let idf = index.bm25_idf("bear").unwrap();
        assert!(idf.is_finite());
        assert!(idf > 0.0);
        // df = N = 4: ln(0.5 / 4.5 + 1), the formula's minimum.
        assert!((idf - (0.5f32 / 4.5 + 1.0).ln()).abs() < 1e-6);
    }

    #[test]
    fn empty_corpus_scores_zero() {
        let index = InvertedIndex::build(&[]);
        assert_eq!(index.avg_doc_len(), 0.0);
        assert_eq!(index.bm25_tf(1, "bear", 1.5, 0.75).unwrap(), 0.0);
        assert!(index.search("bear", 5, 1.5, 0.75).is_empty());
    }

    #[test]
    fn bear_query_never_surfaces_space_war() {
        let index = InvertedIndex::build(&corpus());
        let hits = index.search("bear", 2, 1.5, 0.75);
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(hits.len(), 2);
        assert!(ids.contains(&1) && ids.contains(&2));
        assert!(!ids.contains(&3));
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let docs = vec![
            Document {
                id: 7,
                title: "bear".into(),
                description: "bear den".into(),
            },
            Document {
                id: 2,
                title: "bear".into(),
                description: "bear den".into(),
            },
        ];
        let index = InvertedIndex::build(&docs);
        let hits = index.search("bear", 2, 1.5, 0.75);
        assert_eq!(hits[0].doc_id, 2);
        assert_eq!(hits[1].doc_id, 7);
    }

    #[test]
    fn parallel_search_matches_sequential() {
        let index = InvertedIndex::build(&corpus());
        let seq = index.search("bear picnic", 3, 1.5, 0.75);
        let par = index.par_search("bear picnic", 3, 1.5, 0.75);
        assert_eq!(seq, par);
    }
}
