//! Engine error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// A term-level operation was handed text that normalizes to more than
    /// one token.
    #[error("expected a single term, got {tokens} tokens from {term:?}")]
    MultiTokenTerm { term: String, tokens: usize },

    /// A query or embedding input was empty after trimming.
    #[error("input text is empty")]
    EmptyInput,

    /// A persisted blob the cache layout requires is absent.
    #[error("missing {name} artifact at {path}")]
    MissingArtifact { name: &'static str, path: PathBuf },

    /// A persisted store no longer matches the corpus it was built from.
    #[error("persisted store holds {stored} entries but the corpus has {expected}")]
    CorpusSizeMismatch { stored: usize, expected: usize },

    /// The on-disk artifact format predates (or postdates) this build.
    #[error("index format version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    /// A fusion strategy name with no implementation behind it.
    #[error("fusion strategy {strategy:?} is not implemented")]
    UnimplementedStrategy { strategy: String },

    /// An embedding or generation backend failed.
    #[error("provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("artifact encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}
