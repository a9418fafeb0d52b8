use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use convkit_core::traits::{LanguageModel, Retriever};
use convkit_core::types::LlmMessage;
use convkit_core::{Error, Result};

use crate::query::{make_query_standalone, query_expansion, retrieve_for_queries};

/// A function the model can call, described by a JSON schema.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> &Value;
    async fn call(&self, args: Value) -> Result<Value>;

    /// Chat Completions `tools` entry.
    fn json_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

/// Exposes a retriever as a tool.
///
/// Arguments: `_query` (string, required) and `_history` (list of messages,
/// optional). Returns `{"_sources": [...]}`.
pub struct RetrieverTool {
    name: String,
    description: String,
    parameters: Value,
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    number_query_expansion: usize,
}

impl RetrieverTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            llm,
            retriever,
            number_query_expansion: 0,
        }
    }

    #[must_use]
    pub fn with_query_expansion(mut self, count: usize) -> Self {
        self.number_query_expansion = count;
        self
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn parameters(&self) -> &Value { &self.parameters }

    async fn call(&self, args: Value) -> Result<Value> {
        let mut query = args
            .get("_query")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidInput("missing string argument `_query`".into()))?
            .to_string();
        let history: Vec<LlmMessage> = match args.get("_history") {
            Some(h) if !h.is_null() => serde_json::from_value(h.clone())?,
            _ => Vec::new(),
        };

        if !history.is_empty() {
            query = make_query_standalone(self.llm.as_ref(), &history, &query).await?;
        }
        let queries = query_expansion(self.llm.as_ref(), &query, self.number_query_expansion).await?;
        let sources = retrieve_for_queries(self.retriever.as_ref(), &queries).await?;

        let json_chunks: Vec<Value> = sources
            .iter()
            .map(|s| {
                let chunk = s.chunk();
                let mut metadata = chunk.metadata.clone();
                metadata.insert("id".into(), Value::from(s.id()));
                json!({
                    "id": s.id(),
                    "title": chunk.title,
                    "content": chunk.content,
                    "mime_type": chunk.mime_type,
                    "metadata": metadata,
                })
            })
            .collect();
        Ok(json!({ "_sources": json_chunks }))
    }
}
