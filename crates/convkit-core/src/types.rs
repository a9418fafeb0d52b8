//! Domain types shared by retrievers, stores and agents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ChunkId = String;
pub type Metadata = HashMap<String, serde_json::Value>;

/// A unit of retrievable content produced by a chunker.
///
/// - `title`: human readable heading (may be empty)
/// - `content`: the text payload
/// - `mime_type`: media type of `content`, e.g. `text/plain`
/// - `metadata`: open-ended key/value annotations (scalars or structs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub title: String,
    pub content: String,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(title: impl Into<String>, content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into(), mime_type: mime_type.into(), metadata: Metadata::new() }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A stored chunk. `id` is its identity; fusion deduplicates on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    #[serde(flatten)]
    pub chunk: Chunk,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(id: impl Into<ChunkId>, chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { id: id.into(), chunk, embedding }
    }

    /// Attach a relevance score, producing a match.
    pub fn scored(self, score: f32) -> ChunkMatch {
        ChunkMatch { record: self, score }
    }
}

impl AsRef<ChunkRecord> for ChunkRecord {
    fn as_ref(&self) -> &ChunkRecord {
        self
    }
}

/// A record returned by a retriever. `score` is higher-is-better and only
/// comparable within one result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMatch {
    #[serde(flatten)]
    pub record: ChunkRecord,
    pub score: f32,
}

impl ChunkMatch {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn chunk(&self) -> &Chunk {
        &self.record.chunk
    }
}

impl AsRef<ChunkRecord> for ChunkMatch {
    fn as_ref(&self) -> &ChunkRecord {
        &self.record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn of a conversation sent to or received from a language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryWithContext {
    pub query: String,
    #[serde(default)]
    pub history: Vec<LlmMessage>,
}

/// Final answer of an agent together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAnswer {
    pub content: String,
    pub sources: Vec<ChunkMatch>,
}
