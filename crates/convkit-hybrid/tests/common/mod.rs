#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use convkit_core::traits::{LanguageModel, Retriever};
use convkit_core::types::{Chunk, ChunkMatch, ChunkRecord, LlmMessage};
use convkit_core::{Error, Result};

pub fn record(id: &str) -> ChunkRecord {
    ChunkRecord::new(id, Chunk::new(format!("title {id}"), format!("content of {id}"), "text/plain"), vec![])
}

pub fn matches(ids: &[&str]) -> Vec<ChunkMatch> {
    ids.iter().enumerate().map(|(i, id)| record(id).scored(1.0 / (i as f32 + 1.0))).collect()
}

pub fn ids(results: &[ChunkMatch]) -> Vec<String> {
    results.iter().map(|m| m.id().to_string()).collect()
}

/// Returns a fixed list, optionally after a delay.
pub struct StaticRetriever {
    pub results: Vec<ChunkMatch>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(ids: &[&str]) -> Self {
        Self { results: matches(ids), delay: None, calls: AtomicUsize::new(0) }
    }

    pub fn slow(ids: &[&str], delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new(ids) }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn top_k(&self) -> usize { self.results.len() }

    async fn retrieve(&self, _query: &str) -> Result<Vec<ChunkMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        Ok(self.results.clone())
    }
}

/// Fails like a dropped backend connection.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn top_k(&self) -> usize { 5 }

    async fn retrieve(&self, _query: &str) -> Result<Vec<ChunkMatch>> {
        Err(Error::Unavailable("connection refused".into()))
    }
}

/// Replays canned replies and records every conversation it was sent.
pub struct ScriptedLlm {
    replies: Mutex<Vec<Result<String>>>,
    pub seen: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedLlm {
    pub fn replying(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
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
