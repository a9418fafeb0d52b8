//! Reciprocal Rank Fusion.
//!
//! ```text
//! score(id) = Σ 1 / (k + rank)   over every list containing id, rank 1-indexed
//! ```
//!
//! Only positions matter, so lists whose native scores live on different
//! scales (cosine similarity, BM25, synthetic rerank scores) fuse cleanly.

use std::collections::HashMap;

use convkit_core::types::{ChunkMatch, ChunkRecord};

pub const DEFAULT_RRF_K: u32 = 60;

/// Merge ranked lists into one list of unique ids ordered by fused score.
///
/// The returned record for an id is its last occurrence across the inputs.
/// Equal fused scores keep first-seen order (lists scanned left to right,
/// each top to bottom), so identical inputs always give identical output.
/// No cutoff is applied.
pub fn reciprocal_rank_fusion<R: AsRef<ChunkRecord>>(lists: &[Vec<R>], k: u32) -> Vec<ChunkMatch> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut fused: Vec<(f32, &ChunkRecord)> = Vec::new();

    for list in lists {
        for (i, item) in list.iter().enumerate() {
            let record = item.as_ref();
            let contribution = rrf_contribution(k, i + 1);
            match slots.get(record.id.as_str()) {
                Some(&slot) => {
                    fused[slot].0 += contribution;
                    fused[slot].1 = record;
                }
                None => {
                    slots.insert(record.id.as_str(), fused.len());
                    fused.push((contribution, record));
                }
            }
        }
    }

    // stable: ties stay in first-seen order
    fused.sort_by(|a, b| b.0.total_cmp(&a.0));
    fused.into_iter().map(|(score, record)| record.clone().scored(score)).collect()
}

#[allow(clippy::cast_precision_loss)]
fn rrf_contribution(k: u32, rank: usize) -> f32 {
    1.0 / (k as f32 + rank as f32)
}
