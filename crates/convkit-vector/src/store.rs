use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use convkit_core::traits::VectorStore;
use convkit_core::types::{Chunk, ChunkMatch, ChunkRecord, Metadata};
use convkit_core::{Error, Result};

/// Content-addressed id: identical (mime type, title, content) share an id.
pub fn chunk_id(chunk: &Chunk) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [&chunk.mime_type, &chunk.title, &chunk.content] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().as_str()[..32].to_string()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

fn matches_filter(metadata: &Metadata, filter: Option<&Metadata>) -> bool {
    filter.map_or(true, |f| f.iter().all(|(k, v)| metadata.get(k) == Some(v)))
}

/// Brute-force cosine store. Records keep insertion order, which also breaks
/// similarity ties.
#[derive(Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Records>,
}

#[derive(Default)]
struct Records {
    rows: Vec<ChunkRecord>,
    slots: HashMap<String, usize>,
}

impl Records {
    fn dim(&self) -> Option<usize> {
        self.rows.first().map(|r| r.embedding.len())
    }
}

impl InMemoryVectorStore {
    pub fn new() -> Self { Self::default() }

    pub async fn len(&self) -> usize { self.inner.read().await.rows.len() }

    pub async fn is_empty(&self) -> bool { self.inner.read().await.rows.is_empty() }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert_chunks(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<String>> {
        if chunks.len() != embeddings.len() {
            return Err(Error::InvalidInput(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        let mut inner = self.inner.write().await;
        let dim = inner.dim().or_else(|| embeddings.first().map(Vec::len));
        if let Some(bad) = embeddings.iter().find(|e| Some(e.len()) != dim) {
            return Err(Error::InvalidInput(format!(
                "embedding has {} dimensions, store expects {}",
                bad.len(),
                dim.unwrap_or_default()
            )));
        }
        let Records { rows, slots } = &mut *inner;
        let mut ids = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let id = chunk_id(chunk);
            let record = ChunkRecord::new(id.clone(), chunk.clone(), embedding.clone());
            match slots.get(&id) {
                Some(&slot) => rows[slot] = record,
                None => {
                    slots.insert(id.clone(), rows.len());
                    rows.push(record);
                }
            }
            ids.push(id);
        }
        debug!(inserted = ids.len(), total = rows.len(), "inserted chunks");
        Ok(ids)
    }

    async fn get_chunks_by_embedding(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<ChunkMatch>> {
        let inner = self.inner.read().await;
        if let Some(dim) = inner.dim().filter(|&d| d != embedding.len()) {
            return Err(Error::InvalidInput(format!(
                "query embedding has {} dimensions, store expects {dim}",
                embedding.len()
            )));
        }
        let mut scored: Vec<(f32, &ChunkRecord)> = inner
            .rows
            .iter()
            .filter(|r| matches_filter(&r.chunk.metadata, filter))
            .map(|r| (cosine(embedding, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(score, r)| r.clone().scored(score)).collect())
    }

    async fn get_chunks_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.slots.get(id).map(|&slot| inner.rows[slot].clone())).collect())
    }
}
