//! Rank fusion: merging a keyword ranking and a semantic ranking.
//!
//! Two interchangeable strategies over a shared merge step. Weighted
//! fusion blends independently min-max-normalized scores; RRF discards
//! scores entirely and sums reciprocal rank positions, which makes it
//! robust to the two sides' very different score scales. In both, a
//! document present on either side is always a fused candidate, and the
//! missing side contributes zero rather than a penalty.

use crate::index::DocId;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Per-document fused record, rebuilt fresh for every query.
///
/// `keyword` and `semantic` hold what the strategy consumed: raw scores
/// for weighted fusion, 1-based rank positions (0.0 when absent) for RRF.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub doc_id: DocId,
    pub keyword: f32,
    pub semantic: f32,
    pub fused: f32,
}

/// Min-max scale scores into `[0, 1]`.
///
/// Empty input yields empty output. When all scores are equal (including
/// a single element) every output is 1.0 — "all equal" reads as "all
/// maximal", and it keeps the denominator away from zero.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    let (Some(min), Some(max)) = (
        scores.iter().copied().reduce(f32::min),
        scores.iter().copied().reduce(f32::max),
    ) else {
        return Vec::new();
    };
    if max == min {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

/// Reciprocal-rank contribution of one present rank: `1 / (k + rank)`.
/// Strictly decreasing in both `rank` and `k`.
pub fn rrf_contribution(rank: usize, k: f32) -> f32 {
    1.0 / (k + rank as f32)
}

/// Weighted linear fusion.
///
/// Both score lists are normalized independently, then blended as
/// `alpha * keyword + (1 - alpha) * semantic`. The stored components are
/// the raw input scores; the fused value is computed from the normalized
/// ones.
pub fn weighted_fusion(
    keyword: &[(DocId, f32)],
    semantic: &[(DocId, f32)],
    alpha: f32,
    limit: usize,
) -> Vec<FusedScore> {
    let kw_norm = normalize_scores(&keyword.iter().map(|&(_, s)| s).collect::<Vec<_>>());
    let sem_norm = normalize_scores(&semantic.iter().map(|&(_, s)| s).collect::<Vec<_>>());

    // (raw keyword, raw semantic, normalized keyword, normalized semantic)
    let mut merged: BTreeMap<DocId, (f32, f32, f32, f32)> = BTreeMap::new();
    for (i, &(doc_id, score)) in keyword.iter().enumerate() {
        let entry = merged.entry(doc_id).or_default();
        entry.0 = score;
        entry.2 = kw_norm[i];
    }
    for (i, &(doc_id, score)) in semantic.iter().enumerate() {
        let entry = merged.entry(doc_id).or_default();
        entry.1 = score;
        entry.3 = sem_norm[i];
    }

    let fused = merged
        .into_iter()
        .map(|(doc_id, (kw, sem, kw_n, sem_n))| FusedScore {
            doc_id,
            keyword: kw,
            semantic: sem,
            fused: alpha * kw_n + (1.0 - alpha) * sem_n,
        })
        .collect();
    rank(fused, limit)
}

/// Reciprocal Rank Fusion.
///
/// Each side's score ranking becomes a position ranking (rank 1 = best);
/// a document absent from a side is excluded from that side's sum rather
/// than penalized at some rank floor.
pub fn rrf_fusion(
    keyword: &[(DocId, f32)],
    semantic: &[(DocId, f32)],
    k: f32,
    limit: usize,
) -> Vec<FusedScore> {
    // (keyword rank, semantic rank), 1-based, None when absent
    let mut merged: BTreeMap<DocId, (Option<usize>, Option<usize>)> = BTreeMap::new();
    for (i, &(doc_id, _)) in keyword.iter().enumerate() {
        merged.entry(doc_id).or_default().0 = Some(i + 1);
    }
    for (i, &(doc_id, _)) in semantic.iter().enumerate() {
        merged.entry(doc_id).or_default().1 = Some(i + 1);
    }

    let fused = merged
        .into_iter()
        .map(|(doc_id, (kw_rank, sem_rank))| {
            let kw = kw_rank.map_or(0.0, |r| rrf_contribution(r, k));
            let sem = sem_rank.map_or(0.0, |r| rrf_contribution(r, k));
            FusedScore {
                doc_id,
                keyword: kw_rank.map_or(0.0, |r| r as f32),
                semantic: sem_rank.map_or(0.0, |r| r as f32),
                fused: kw + sem,
            }
        })
        .collect();
    rank(fused, limit)
}

/// Descending fused score; ascending document ID on ties. The merged map
/// iterates in ID order, so a stable sort gives the tiebreak for free.
fn rank(mut fused: Vec<FusedScore>, limit: usize) -> Vec<FusedScore> {
    fused.sort_by(|a, b| b.fused.partial_cmp(&a.fused).unwrap_or(Ordering::Equal));
    fused.truncate(limit);
    fused
}
