//! convkit-embed
//!
//! Offline embedder based on feature hashing. Tokens are hashed with xxHash64
//! into a fixed number of buckets and the resulting vector is L2-normalized,
//! so identical texts always embed identically and texts sharing words land
//! close together under cosine similarity.
use std::hash::{Hash, Hasher};

use convkit_core::traits::Embedder;
use convkit_core::Result;
use twox_hash::XxHash64;

pub const DEFAULT_DIM: usize = 384;

pub struct HashEmbedder { dim: usize, max_len: usize }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1), max_len: 512 } }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().take(self.max_len).enumerate() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 1.0 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn get_default_embedder(dim: usize) -> Box<dyn Embedder> {
    tracing::debug!(dim, "using hash embedder");
    Box::new(HashEmbedder::new(dim))
}
