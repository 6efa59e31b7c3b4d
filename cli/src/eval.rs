//! Retrieval-quality scoring against a golden dataset.
//!
//! A golden case pairs a query with the document IDs a correct engine
//! should surface. Each case is scored with precision@k, recall@k, and
//! F1 over the top-k retrieved IDs.

use rankfuse_core::index::DocId;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
pub struct GoldenCase {
    pub query: String,
    pub relevant_ids: Vec<DocId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaseMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

/// Score the top-`k` retrieved IDs against the relevant set.
///
/// Precision is over the IDs actually retrieved (at most `k`), recall is
/// over the relevant set; both are 0.0 when their denominator is empty.
pub fn precision_recall_f1(retrieved: &[DocId], relevant: &[DocId], k: usize) -> CaseMetrics {
    let top_k = &retrieved[..retrieved.len().min(k)];
    let relevant: HashSet<DocId> = relevant.iter().copied().collect();
    let hits = top_k.iter().filter(|id| relevant.contains(id)).count() as f32;

    let precision = if top_k.is_empty() {
        0.0
    } else {
        hits / top_k.len() as f32
    };
    let recall = if relevant.is_empty() {
        0.0
    } else {
        hits / relevant.len() as f32
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    CaseMetrics {
        precision,
        recall,
        f1,
    }
}

/// Arithmetic mean of per-case metrics; all zeros for an empty set.
pub fn mean_metrics(cases: &[CaseMetrics]) -> CaseMetrics {
    if cases.is_empty() {
        return CaseMetrics {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }
    let n = cases.len() as f32;
    CaseMetrics {
        precision: cases.iter().map(|m| m.precision).sum::<f32>() / n,
        recall: cases.iter().map(|m| m.recall).sum::<f32>() / n,
        f1: cases.iter().map(|m| m.f1).sum::<f32>() / n,
    }
}
