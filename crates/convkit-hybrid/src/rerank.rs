//! Two-stage retrieval: a base retriever supplies a candidate pool and a
//! language model reorders it.
//!
//! Configure the base retriever's `top_k` as the pool size (typically 3-4x
//! the reranker's own `top_k`). The model sees the query plus each
//! candidate's title and a bounded excerpt, and answers with
//! `{"ranking": [i, j, ...]}`. Scores are synthetic: position `p` of `n`
//! candidates scores `(n - p) / n`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use convkit_core::traits::{LanguageModel, Retriever};
use convkit_core::types::{ChunkMatch, LlmMessage};
use convkit_core::{Error, Result};

pub const DEFAULT_EXCERPT_CHARS: usize = 400;

const SYSTEM_PROMPT: &str = "You are an expert at assessing document relevance. Output only valid JSON.";

pub struct RerankingRetriever {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LanguageModel>,
    top_k: usize,
    excerpt_chars: usize,
}

impl RerankingRetriever {
    pub fn new(retriever: Arc<dyn Retriever>, llm: Arc<dyn LanguageModel>, top_k: usize) -> Self {
        Self { retriever, llm, top_k, excerpt_chars: DEFAULT_EXCERPT_CHARS }
    }

    #[must_use]
    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    fn build_prompt(&self, query: &str, candidates: &[ChunkMatch]) -> String {
        let numbered = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let title = if c.chunk().title.is_empty() { "(no title)" } else { c.chunk().title.as_str() };
                format!("[{i}] {title}\n{}", excerpt(&c.chunk().content, self.excerpt_chars))
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "Query: {query}\n\n\
             Rank the following {n} document chunks from most to least relevant\n\
             to the query. Output only a JSON object with a single key \"ranking\" whose value\n\
             is a list of the chunk indices ordered from most to least relevant.\n\n\
             Chunks:\n{numbered}\n\n\
             Output format: {{\"ranking\": [most_relevant_index, second_index, ...]}}",
            n = candidates.len()
        )
    }

    /// Model-proposed order of candidate indices, repaired into a full
    /// permutation. Any error means the model's answer is unusable.
    async fn llm_rerank(&self, query: &str, candidates: &[ChunkMatch]) -> Result<Vec<usize>> {
        let messages = [LlmMessage::system(SYSTEM_PROMPT), LlmMessage::user(self.build_prompt(query, candidates))];
        let response = self.llm.generate(&messages).await?;
        parse_ranking(&response.content, candidates.len())
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_index(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse `{"ranking": [...]}` into a permutation of `0..n`.
///
/// Out-of-range and repeated indices are dropped; indices the model left
/// out are appended in their original order. A non-JSON reply, a missing or
/// non-list `ranking`, or a non-integer entry is an error.
pub fn parse_ranking(text: &str, n: usize) -> Result<Vec<usize>> {
    let data: Value = serde_json::from_str(text.trim())?;
    let entries = data
        .get("ranking")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidInput("reply has no \"ranking\" list".into()))?;

    let mut seen = HashSet::with_capacity(n);
    let mut ranking = Vec::with_capacity(n);
    for entry in entries {
        let idx = as_index(entry).ok_or_else(|| Error::InvalidInput(format!("ranking entry {entry} is not an integer")))?;
        if let Ok(idx) = usize::try_from(idx) {
            if idx < n && seen.insert(idx) {
                ranking.push(idx);
            }
        }
    }
    ranking.extend((0..n).filter(|i| !seen.contains(i)));
    Ok(ranking)
}

#[async_trait]
impl Retriever for RerankingRetriever {
    fn top_k(&self) -> usize { self.top_k }

    async fn retrieve(&self, query: &str) -> Result<Vec<ChunkMatch>> {
        let candidates = self.retriever.retrieve(query).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ranking = self.llm_rerank(query, &candidates).await.unwrap_or_else(|e| {
            warn!(error = %e, "reranking failed, using original order");
            (0..candidates.len()).collect()
        });
        debug!(candidates = candidates.len(), ?ranking, "reranked");

        let n = ranking.len();
        #[allow(clippy::cast_precision_loss)]
        let results = ranking
            .into_iter()
            .take(self.top_k)
            .enumerate()
            .map(|(position, idx)| {
                let score = (n - position) as f32 / n as f32;
                candidates[idx].record.clone().scored(score)
            })
            .collect();
        Ok(results)
    }
}
