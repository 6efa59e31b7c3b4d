//! Passage chunking for finer-grained semantic matching.
//!
//! Two strategies: fixed word windows and sentence-bounded windows. Both
//! overlap consecutive chunks so context at the boundary is not lost.

use crate::index::DocId;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Terminal punctuation followed by whitespace, or at end of text.
    // Abbreviations like "Dr." over-split; acceptable for chunking.
    static ref SENTENCE_RE: Regex = Regex::new(r"[.!?]+(?:\s+|$)").expect("valid regex");
}

/// Provenance of one chunk row in the chunked vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub doc_id: DocId,
    /// 1-based position within the parent document.
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Split text into overlapping windows of `size` words. Each window starts
/// `size - overlap` words after the previous start; the final partial
/// window is kept even when shorter than `size`.
///
/// # Panics
///
/// Panics if `overlap >= size` (the window would never advance).
pub fn fixed_chunk(text: &str, size: usize, overlap: usize) -> Vec<Vec<String>> {
    assert!(overlap < size, "overlap must be less than chunk size");
    let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return Vec::new();
    }
    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].to_vec());
        if end >= words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Split text into overlapping groups of up to `max_sentences` sentences,
/// each joined with single spaces.
///
/// Sentences end at terminal punctuation followed by whitespace. A single
/// sentence without terminal punctuation becomes one chunk holding the
/// whole text. Chunks empty after trimming are dropped, and no
/// non-whitespace content is ever lost.
///
/// # Panics
///
/// Panics if `overlap >= max_sentences`.
pub fn semantic_chunk(text: &str, max_sentences: usize, overlap: usize) -> Vec<String> {
    assert!(
        overlap < max_sentences,
        "overlap must be less than max sentences"
    );
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(text);
    if sentences.len() == 1 && !ends_with_terminal(text) {
        return vec![text.to_string()];
    }

    let step = max_sentences - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < sentences.len() {
        let end = (start + max_sentences).min(sentences.len());
        let joined = sentences[start..end].join(" ");
        let joined = joined.trim();
        if !joined.is_empty() {
            chunks.push(joined.to_string());
        }
        if end >= sentences.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for mat in SENTENCE_RE.find_iter(text) {
        let sentence = text[last..mat.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = mat.end();
    }
    // Trailing sentence without terminal punctuation.
    if last < text.len() {
        let sentence = text[last..].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
    }
    sentences
}

fn ends_with_terminal(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}
