#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use convkit_core::traits::{LanguageModel, Retriever};
use convkit_core::types::{Chunk, ChunkMatch, ChunkRecord, LlmMessage};
use convkit_core::{Error, Result};

pub fn record(id: &str) -> ChunkRecord {
    ChunkRecord::new(id, Chunk::new(format!("title {id}"), format!("content of {id}"), "text/plain"), vec![])
}

/// Maps each query string to a fixed ranked list; unknown queries get nothing.
pub struct QueryMapRetriever {
    pub by_query: HashMap<String, Vec<&'static str>>,
    pub top_k: usize,
    pub seen: Mutex<Vec<String>>,
}

impl QueryMapRetriever {
    pub fn new(pairs: &[(&str, &[&'static str])], top_k: usize) -> Arc<Self> {
        Arc::new(Self {
            by_query: pairs.iter().map(|(q, ids)| (q.to_string(), ids.to_vec())).collect(),
            top_k,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Retriever for QueryMapRetriever {
    fn top_k(&self) -> usize { self.top_k }

    async fn retrieve(&self, query: &str) -> Result<Vec<ChunkMatch>> {
        self.seen.lock().unwrap().push(query.to_string());
        let ids = self.by_query.get(query).cloned().unwrap_or_default();
        Ok(ids.into_iter().map(|id| record(id).scored(1.0)).collect())
    }
}

pub struct ScriptedLlm {
    replies: Mutex<Vec<Result<String>>>,
    pub seen: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedLlm {
    pub fn replying(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> usize { self.seen.lock().unwrap().len() }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, conversation: &[LlmMessage]) -> Result<LlmMessage> {
        self.seen.lock().unwrap().push(conversation.to_vec());
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.is_empty() { Err(Error::Llm("no scripted reply left".into())) } else { replies.remove(0) };
        reply.map(LlmMessage::assistant)
    }
}
