//! Cache-directory layout and artifact I/O.
//!
//! Every persisted blob lives under one root addressed by [`IndexPaths`];
//! callers pass the paths object in explicitly, there is no process-wide
//! path state. Writes land in a temporary file in the target directory and
//! are atomically renamed into place, so a concurrent reader never
//! observes a partially written artifact.

use crate::error::{Result, SearchError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct IndexPaths {
    root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> PathBuf {
        self.root.join("index.bin")
    }

    pub fn docmap(&self) -> PathBuf {
        self.root.join("docmap.bin")
    }

    pub fn term_frequencies(&self) -> PathBuf {
        self.root.join("term_frequencies.bin")
    }

    pub fn doc_lengths(&self) -> PathBuf {
        self.root.join("doc_lengths.bin")
    }

    pub fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn embeddings(&self) -> PathBuf {
        self.root.join("embeddings.bin")
    }

    pub fn chunk_embeddings(&self) -> PathBuf {
        self.root.join("chunk_embeddings.bin")
    }

    pub fn chunk_meta(&self) -> PathBuf {
        self.root.join("chunk_meta.bin")
    }
}

/// Index-level metadata, written alongside the binary artifacts so a cache
/// directory is inspectable without decoding them.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexMeta {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

impl IndexMeta {
    pub fn now(num_docs: u32) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self {
            num_docs,
            created_at,
            version: INDEX_VERSION,
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| SearchError::Io(e.error))?;
    Ok(())
}

pub(crate) fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, &bincode::serialize(value)?)
}

/// Read one bincode artifact, reporting which blob is missing by name so a
/// partially built cache is diagnosable.
pub(crate) fn read_artifact<T: DeserializeOwned>(name: &'static str, path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(SearchError::MissingArtifact {
            name,
            path: path.to_path_buf(),
        });
    }
    Ok(bincode::deserialize(&fs::read(path)?)?)
}

pub(crate) fn write_meta(paths: &IndexPaths, meta: &IndexMeta) -> Result<()> {
    write_atomic(&paths.meta(), serde_json::to_string_pretty(meta)?.as_bytes())
}

pub(crate) fn read_meta(paths: &IndexPaths) -> Result<IndexMeta> {
    let path = paths.meta();
    if !path.exists() {
        return Err(SearchError::MissingArtifact {
            name: "meta",
            path,
        });
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_names_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let err = read_artifact::<Vec<u32>>("docmap", &paths.docmap()).unwrap_err();
        match err {
            SearchError::MissingArtifact { name, path } => {
                assert_eq!(name, "docmap");
                assert!(path.ends_with("docmap.bin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("values.bin");
        write_artifact(&path, &vec![1u32, 2, 3]).unwrap();
        let values: Vec<u32> = read_artifact("values", &path).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn meta_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        write_meta(&paths, &IndexMeta::now(42)).unwrap();
        let meta = read_meta(&paths).unwrap();
        assert_eq!(meta.num_docs, 42);
        assert_eq!(meta.version, INDEX_VERSION);
    }
}
