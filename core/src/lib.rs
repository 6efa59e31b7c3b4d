//! rankfuse: a hybrid lexical/semantic retrieval and fusion engine.
//!
//! Documents are ranked against free-text queries by fusing BM25 over an
//! inverted index with cosine similarity over dense vectors, using either
//! weighted linear combination or Reciprocal Rank Fusion. The embedding
//! model is a pluggable [`providers::EmbeddingProvider`]; everything else
//! — tokenization, indexing, chunking, vector scan, fusion, persistence —
//! lives here.

pub mod chunk;
pub mod config;
pub mod error;
pub mod fusion;
pub mod hybrid;
pub mod index;
pub mod persist;
pub mod providers;
pub mod tokenizer;
pub mod vector;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use hybrid::{HybridSearch, RankedResult};
pub use index::{DocId, Document, InvertedIndex};
pub use persist::IndexPaths;
