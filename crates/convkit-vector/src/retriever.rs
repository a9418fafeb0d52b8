use std::sync::Arc;

use async_trait::async_trait;

use convkit_core::traits::{Embedder, Retriever, VectorStore};
use convkit_core::types::{ChunkMatch, Metadata};
use convkit_core::{Error, Result};

/// Embeds the query and asks the store for its nearest neighbours.
pub struct VectorStoreRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    filter: Option<Metadata>,
}

impl VectorStoreRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { embedder, store, top_k, filter: None }
    }

    /// Restrict every lookup to records whose metadata matches `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Metadata) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[async_trait]
impl Retriever for VectorStoreRetriever {
    fn top_k(&self) -> usize { self.top_k }

    async fn retrieve(&self, query: &str) -> Result<Vec<ChunkMatch>> {
        let embedding = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .pop()
            .ok_or_else(|| Error::Operation("embedder returned no vector for the query".into()))?;
        self.store.get_chunks_by_embedding(&embedding, self.top_k, self.filter.as_ref()).await
    }
}
