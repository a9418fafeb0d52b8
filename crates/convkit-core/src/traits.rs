use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, ChunkMatch, ChunkRecord, LlmMessage, Metadata};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A ranked lookup over some corpus.
///
/// Implementations return at most `top_k()` matches ordered by decreasing
/// relevance. No matches is `Ok(vec![])`, never an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn top_k(&self) -> usize;
    async fn retrieve(&self, query: &str) -> Result<Vec<ChunkMatch>>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single non-streaming completion over the whole conversation.
    async fn generate(&self, conversation: &[LlmMessage]) -> Result<LlmMessage>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store `chunks` with their `embeddings` (same length, same order) and
    /// return the assigned ids.
    async fn insert_chunks(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<String>>;

    /// Nearest neighbours of `embedding`. `filter` keeps only records whose
    /// metadata equals every given key/value.
    async fn get_chunks_by_embedding(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<ChunkMatch>>;

    async fn get_chunks_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>>;
}
