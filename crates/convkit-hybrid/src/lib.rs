//! convkit-hybrid
//!
//! Composition layer over [`Retriever`](convkit_core::traits::Retriever):
//! reciprocal rank fusion, concurrent hybrid retrieval and LLM reranking.
//! Both retrievers defined here are retrievers themselves and nest freely.
pub mod fusion;
pub mod hybrid;
pub mod lexical;
pub mod rerank;

pub use fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};
pub use hybrid::HybridRetriever;
pub use lexical::Bm25Retriever;
pub use rerank::RerankingRetriever;
