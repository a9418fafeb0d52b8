//! convkit-vector
//!
//! In-memory vector store and the retriever that queries it through an
//! [`Embedder`](convkit_core::traits::Embedder).
pub mod retriever;
pub mod store;

pub use retriever::VectorStoreRetriever;
pub use store::{chunk_id, InMemoryVectorStore};
