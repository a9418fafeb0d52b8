//! convkit-agent
//!
//! Everything between a user's question and the retrievers: query
//! rewriting and expansion, multi-query retrieval, prompt construction, and
//! the RAG agent / retriever tool built from them.
pub mod agent;
pub mod prompt;
pub mod query;
pub mod tool;

pub use agent::RagAgent;
pub use prompt::build_query_with_chunks;
pub use query::{make_query_standalone, query_expansion, retrieve_for_queries};
pub use tool::{RetrieverTool, Tool};
