use std::sync::Arc;

use tracing::{debug, info};

use convkit_core::traits::{LanguageModel, Retriever};
use convkit_core::types::{AgentAnswer, LlmMessage, QueryWithContext};
use convkit_core::Result;

use crate::prompt::build_query_with_chunks;
use crate::query::{make_query_standalone, query_expansion, retrieve_for_queries};

/// Retrieval-augmented answering.
///
/// `utility_llm` handles query rewriting and expansion, `llm` writes the
/// answer. Every retriever contributes up to its own `top_k` sources.
pub struct RagAgent {
    llm: Arc<dyn LanguageModel>,
    utility_llm: Arc<dyn LanguageModel>,
    retrievers: Vec<Arc<dyn Retriever>>,
    system_prompt: String,
    number_query_expansion: usize,
}

impl RagAgent {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        utility_llm: Arc<dyn LanguageModel>,
        retrievers: Vec<Arc<dyn Retriever>>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self { llm, utility_llm, retrievers, system_prompt: system_prompt.into(), number_query_expansion: 0 }
    }

    #[must_use]
    pub fn with_query_expansion(mut self, count: usize) -> Self {
        self.number_query_expansion = count;
        self
    }

    pub async fn answer(&self, input: QueryWithContext) -> Result<AgentAnswer> {
        let QueryWithContext { mut query, history } = input;

        if !history.is_empty() {
            query = make_query_standalone(self.utility_llm.as_ref(), &history, &query).await?;
        }
        let queries = query_expansion(self.utility_llm.as_ref(), &query, self.number_query_expansion).await?;

        let mut sources = Vec::new();
        for retriever in &self.retrievers {
            sources.extend(retrieve_for_queries(retriever.as_ref(), &queries).await?);
        }
        debug!(queries = queries.len(), sources = sources.len(), "retrieved sources");

        let mut conversation = Vec::with_capacity(history.len() + 2);
        conversation.push(LlmMessage::system(self.system_prompt.clone()));
        conversation.extend(history);
        conversation.push(LlmMessage::user(build_query_with_chunks(&query, &sources)));

        let reply = self.llm.generate(&conversation).await?;
        info!(sources = sources.len(), "answer generated");
        Ok(AgentAnswer { content: reply.content, sources })
    }
}
