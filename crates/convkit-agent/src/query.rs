use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, warn};

use convkit_core::traits::{LanguageModel, Retriever};
use convkit_core::types::{ChunkMatch, LlmMessage, Role};
use convkit_core::Result;
use convkit_hybrid::{reciprocal_rank_fusion, DEFAULT_RRF_K};

fn render_history(history: &[LlmMessage]) -> String {
    history
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            format!("{who}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite `query` so it can be understood without `history`.
///
/// An empty reply leaves the query unchanged.
pub async fn make_query_standalone(llm: &dyn LanguageModel, history: &[LlmMessage], query: &str) -> Result<String> {
    let prompt = format!(
        "Conversation so far:\n{}\n\n\
         Rewrite the last user question so that it is fully self-contained and can be\n\
         understood without the conversation. Keep the original language. Output only\n\
         the rewritten question.\n\nQuestion: {query}",
        render_history(history)
    );
    let reply = llm
        .generate(&[
            LlmMessage::system("You rewrite follow-up questions into standalone search queries."),
            LlmMessage::user(prompt),
        ])
        .await?;
    let rewritten = reply.content.trim();
    if rewritten.is_empty() {
        return Ok(query.to_string());
    }
    debug!(original = query, rewritten, "standalone query");
    Ok(rewritten.to_string())
}

/// `query` followed by up to `count` distinct paraphrases from the model.
///
/// A reply that is not `{"queries": [..strings..]}` yields just `[query]`.
pub async fn query_expansion(llm: &dyn LanguageModel, query: &str, count: usize) -> Result<Vec<String>> {
    if count == 0 {
        return Ok(vec![query.to_string()]);
    }
    let prompt = format!(
        "Write {count} alternative phrasings of the search query below. Each should keep the\n\
         meaning but vary wording so that different relevant documents can be found.\n\
         Output only a JSON object: {{\"queries\": [\"...\", ...]}}\n\nQuery: {query}"
    );
    let reply = llm
        .generate(&[
            LlmMessage::system("You generate search query variations. Output only valid JSON."),
            LlmMessage::user(prompt),
        ])
        .await?;

    let mut queries = vec![query.to_string()];
    match parse_queries(&reply.content) {
        Some(variants) => {
            for v in variants {
                if queries.len() > count {
                    break;
                }
                if !queries.iter().any(|q| q.eq_ignore_ascii_case(&v)) {
                    queries.push(v);
                }
            }
        }
        None => warn!(reply = %reply.content, "query expansion reply unusable, using the original query only"),
    }
    Ok(queries)
}

fn parse_queries(text: &str) -> Option<Vec<String>> {
    let v: Value = serde_json::from_str(text.trim()).ok()?;
    let list = v.get("queries")?.as_array()?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Run every query against `retriever` concurrently and fuse the lists,
/// keeping the retriever's `top_k`. Any failing probe fails the call.
pub async fn retrieve_for_queries(retriever: &dyn Retriever, queries: &[String]) -> Result<Vec<ChunkMatch>> {
    let lists = try_join_all(queries.iter().map(|q| retriever.retrieve(q))).await?;
    let mut fused = reciprocal_rank_fusion(&lists, DEFAULT_RRF_K);
    fused.truncate(retriever.top_k());
    Ok(fused)
}
