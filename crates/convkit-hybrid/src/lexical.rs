use async_trait::async_trait;

use convkit_core::traits::Retriever;
use convkit_core::types::ChunkMatch;
use convkit_core::{Error, Result};

/// Lexical (BM25) retrieval slot. Not backed by an index yet: every call
/// fails with [`Error::NotImplemented`] so it is never mistaken for a
/// retriever that found nothing.
pub struct Bm25Retriever {
    top_k: usize,
}

impl Bm25Retriever {
    pub fn new(top_k: usize) -> Self { Self { top_k } }
}

#[async_trait]
impl Retriever for Bm25Retriever {
    fn top_k(&self) -> usize { self.top_k }

    async fn retrieve(&self, _query: &str) -> Result<Vec<ChunkMatch>> {
        Err(Error::NotImplemented("bm25 retrieval"))
    }
}
