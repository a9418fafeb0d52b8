use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use convkit_core::config::{FailurePolicy, RetrievalSettings};
use convkit_core::traits::Retriever;
use convkit_core::types::ChunkMatch;
use convkit_core::{Error, Result};

use crate::fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};

/// Fans one query out to every sub-retriever concurrently and fuses the
/// ranked lists with RRF.
///
/// Sub-retrievers may be any [`Retriever`], including other hybrid or
/// reranking retrievers. Latency is that of the slowest branch.
///
/// By default the first failing branch fails the whole call and the other
/// branches are dropped ([`FailurePolicy::Abort`]). [`FailurePolicy::Degrade`]
/// counts a failed branch as an empty list.
pub struct HybridRetriever {
    retrievers: Vec<Arc<dyn Retriever>>,
    top_k: usize,
    rrf_k: u32,
    failure_policy: FailurePolicy,
    timeout: Option<Duration>,
}

impl HybridRetriever {
    pub fn new(retrievers: Vec<Arc<dyn Retriever>>, top_k: usize) -> Self {
        Self { retrievers, top_k, rrf_k: DEFAULT_RRF_K, failure_policy: FailurePolicy::Abort, timeout: None }
    }

    pub fn from_settings(retrievers: Vec<Arc<dyn Retriever>>, settings: &RetrievalSettings) -> Self {
        Self {
            retrievers,
            top_k: settings.top_k,
            rrf_k: settings.rrf_k,
            failure_policy: settings.failure_policy,
            timeout: settings.timeout_ms.map(Duration::from_millis),
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_rrf_k(mut self, rrf_k: u32) -> Self {
        self.rrf_k = rrf_k;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Per-branch deadline. An expired branch fails with [`Error::Timeout`]
    /// and is then handled by the failure policy.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn query_one(&self, retriever: &dyn Retriever, query: &str) -> Result<Vec<ChunkMatch>> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, retriever.retrieve(query))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => retriever.retrieve(query).await,
        }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn top_k(&self) -> usize { self.top_k }

    async fn retrieve(&self, query: &str) -> Result<Vec<ChunkMatch>> {
        let branches = self.retrievers.iter().map(|r| self.query_one(r.as_ref(), query));
        let lists = match self.failure_policy {
            FailurePolicy::Abort => try_join_all(branches).await?,
            FailurePolicy::Degrade => join_all(branches)
                .await
                .into_iter()
                .enumerate()
                .map(|(i, res)| {
                    res.unwrap_or_else(|e| {
                        warn!(retriever = i, error = %e, "sub-retriever failed, continuing without it");
                        Vec::new()
                    })
                })
                .collect(),
        };
        debug!(sources = lists.len(), hits = lists.iter().map(Vec::len).sum::<usize>(), "fusing hybrid results");

        let mut fused = reciprocal_rank_fusion(&lists, self.rrf_k);
        fused.truncate(self.top_k);
        Ok(fused)
    }
}
