mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ids, FailingRetriever, StaticRetriever};
use convkit_core::config::{FailurePolicy, RetrievalSettings};
use convkit_core::traits::Retriever;
use convkit_core::Error;
use convkit_hybrid::{reciprocal_rank_fusion, Bm25Retriever, HybridRetriever, DEFAULT_RRF_K};
use tokio::time::Instant;

#[tokio::test]
async fn hybrid_equals_fusion_of_individual_results() -> anyhow::Result<()> {
    let a = Arc::new(StaticRetriever::new(&["a", "b", "c", "d"]));
    let b = Arc::new(StaticRetriever::new(&["d", "e", "a"]));
    let hybrid = HybridRetriever::new(vec![a.clone(), b.clone()], 3);

    let got = hybrid.retrieve("q").await?;

    let mut expected = reciprocal_rank_fusion(&[a.retrieve("q").await?, b.retrieve("q").await?], DEFAULT_RRF_K);
    expected.truncate(3);
    assert_eq!(got, expected);
    assert_eq!(ids(&got), vec!["a", "d", "b"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sub_retrievers_run_concurrently() -> anyhow::Result<()> {
    let delay = Duration::from_millis(200);
    let retrievers: Vec<Arc<dyn Retriever>> = (0..4)
        .map(|_| Arc::new(StaticRetriever::slow(&["x"], delay)) as Arc<dyn Retriever>)
        .collect();
    let hybrid = HybridRetriever::new(retrievers, 5);

    let start = Instant::now();
    let got = hybrid.retrieve("q").await?;
    // sequential branches would take 4 * delay of paused time
    assert!(start.elapsed() < delay * 2, "latency follows the slowest branch, took {:?}", start.elapsed());
    assert_eq!(got.len(), 1, "same id from every branch is merged");
    Ok(())
}

#[tokio::test]
async fn failing_sub_retriever_fails_the_call() {
    let ok = Arc::new(StaticRetriever::new(&["a", "b"]));
    let hybrid = HybridRetriever::new(vec![ok, Arc::new(FailingRetriever)], 5);

    let err = hybrid.retrieve("q").await.unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn degrade_policy_keeps_healthy_sources() -> anyhow::Result<()> {
    let ok = Arc::new(StaticRetriever::new(&["a", "b"]));
    let hybrid = HybridRetriever::new(vec![Arc::new(FailingRetriever), ok], 5)
        .with_failure_policy(FailurePolicy::Degrade);

    let got = hybrid.retrieve("q").await?;
    assert_eq!(ids(&got), vec!["a", "b"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_branch_times_out() -> anyhow::Result<()> {
    let fast = Arc::new(StaticRetriever::new(&["fast"]));
    let slow = Arc::new(StaticRetriever::slow(&["slow"], Duration::from_secs(5)));

    let strict = HybridRetriever::new(vec![fast.clone(), slow.clone()], 5).with_timeout(Duration::from_millis(50));
    let err = strict.retrieve("q").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");

    let lenient = HybridRetriever::new(vec![fast, slow], 5)
        .with_timeout(Duration::from_millis(50))
        .with_failure_policy(FailurePolicy::Degrade);
    assert_eq!(ids(&lenient.retrieve("q").await?), vec!["fast"]);
    Ok(())
}

#[tokio::test]
async fn nested_hybrids_compose() -> anyhow::Result<()> {
    let inner = HybridRetriever::new(
        vec![Arc::new(StaticRetriever::new(&["a", "b"])), Arc::new(StaticRetriever::new(&["b", "c"]))],
        3,
    );
    let outer = HybridRetriever::new(vec![Arc::new(inner), Arc::new(StaticRetriever::new(&["c"]))], 2).with_rrf_k(1);

    let got = outer.retrieve("q").await?;
    assert_eq!(got.len(), 2);
    assert_eq!(outer.top_k(), 2);
    Ok(())
}

#[tokio::test]
async fn settings_configure_policy_and_cutoff() -> anyhow::Result<()> {
    let settings = RetrievalSettings { top_k: 1, failure_policy: FailurePolicy::Degrade, ..RetrievalSettings::default() };
    let hybrid = HybridRetriever::from_settings(
        vec![Arc::new(FailingRetriever), Arc::new(StaticRetriever::new(&["a", "b"]))],
        &settings,
    );
    assert_eq!(ids(&hybrid.retrieve("q").await?), vec!["a"]);

    let widened = HybridRetriever::from_settings(vec![Arc::new(StaticRetriever::new(&["a", "b"]))], &settings).with_top_k(2);
    assert_eq!(widened.top_k(), 2);
    assert_eq!(ids(&widened.retrieve("q").await?), vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn empty_sources_give_empty_result() -> anyhow::Result<()> {
    let hybrid = HybridRetriever::new(vec![Arc::new(StaticRetriever::new(&[]))], 5);
    assert!(hybrid.retrieve("q").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn bm25_placeholder_fails_loudly() {
    let bm25 = Bm25Retriever::new(5);
    assert!(matches!(bm25.retrieve("q").await, Err(Error::NotImplemented(_))));

    let hybrid = HybridRetriever::new(vec![Arc::new(StaticRetriever::new(&["a"])), Arc::new(bm25)], 5);
    assert!(matches!(hybrid.retrieve("q").await, Err(Error::NotImplemented(_))));
}
