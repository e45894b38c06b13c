use std::cmp::Ordering;

use super::{IndexedChunk, SearchHit};
use crate::domain::embedding::cosine_similarity;

/// Score every chunk against the query vector, best first, truncated to `top_k`.
///
/// Ties keep index order, so results are stable across calls.
pub fn rank(query: &[f32], chunks: &[IndexedChunk], top_k: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = chunks
        .iter()
        .map(|c| SearchHit::new(&c.id, cosine_similarity(query, &c.embedding), &c.chunk))
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);
    hits
}
