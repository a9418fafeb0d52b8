use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use convkit_agent::RagAgent;
use convkit_core::config::{expand_path, Config, LlmConfig, RetrievalSettings};
use convkit_core::data_processor::DataProcessor;
use convkit_core::traits::{Embedder, LanguageModel, Retriever, VectorStore};
use convkit_core::types::{ChunkMatch, QueryWithContext};
use convkit_embed::{HashEmbedder, DEFAULT_DIM};
use convkit_hybrid::{HybridRetriever, RerankingRetriever};
use convkit_llm::ChatClients;
use convkit_vector::{InMemoryVectorStore, VectorStoreRetriever};

const EMBED_BATCH: usize = 64;
const SYSTEM_PROMPT: &str = "You answer questions using only the provided sources and cite them by number.";

fn parse_args() -> (String, String, Option<PathBuf>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.len() < 2 {
        eprintln!("Usage: {} <retrieve|answer> \"<query>\" [data_dir]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    let query = args.remove(0);
    (cmd, query, args.first().map(PathBuf::from))
}

async fn build_index(data_dir: &Path, embedder: &dyn Embedder, store: &InMemoryVectorStore) -> anyhow::Result<usize> {
    let chunks = DataProcessor::new().process_directory(data_dir)?;
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(ProgressStyle::with_template("{spinner} embedding [{bar:40}] {pos}/{len}")?.progress_chars("=> "));
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        store.insert_chunks(batch, &embeddings).await?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    Ok(chunks.len())
}

fn build_retriever(
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    settings: &RetrievalSettings,
    llm: Option<Arc<dyn LanguageModel>>,
) -> Arc<dyn Retriever> {
    let dense: Arc<dyn Retriever> = Arc::new(VectorStoreRetriever::new(embedder, store, settings.candidate_pool));
    // a reranker cuts to top_k itself and needs the whole pool
    let fused_k = if llm.is_some() { settings.candidate_pool } else { settings.top_k };
    let hybrid: Arc<dyn Retriever> =
        Arc::new(HybridRetriever::from_settings(vec![dense], settings).with_top_k(fused_k));
    match llm {
        Some(llm) => Arc::new(
            RerankingRetriever::new(hybrid, llm, settings.top_k).with_excerpt_chars(settings.excerpt_chars),
        ),
        None => hybrid,
    }
}

fn print_matches(matches: &[ChunkMatch]) {
    for (i, m) in matches.iter().enumerate() {
        let chunk = m.chunk();
        let preview: String = chunk.content.chars().take(160).collect();
        println!("{:>2}. [{:.4}] {} ({})\n    {}", i + 1, m.score, chunk.title, m.id(), preview.replace('\n', " "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.retrieval()?;
    let llm_config: LlmConfig = config.llm()?;
    let (cmd, query, data_dir) = parse_args();
    let data_dir = data_dir.unwrap_or_else(|| {
        let dir: String = config.get("data.txt_dir").unwrap_or_else(|_| "./data/txt".to_string());
        expand_path(dir)
    });

    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(config.get("embedding.dim").unwrap_or(DEFAULT_DIM)));
    let store = Arc::new(InMemoryVectorStore::new());
    let indexed = build_index(&data_dir, embedder.as_ref(), &store).await?;
    info!(chunks = indexed, dir = %data_dir.display(), "index built");

    let clients = ChatClients::from_config(&llm_config);
    let ranker = clients.as_ref().map(|c| Arc::new(c.ranker.clone()) as Arc<dyn LanguageModel>);
    let retriever = build_retriever(embedder, store, &settings, ranker);

    match cmd.as_str() {
        "retrieve" => {
            let matches = retriever.retrieve(&query).await?;
            if matches.is_empty() {
                println!("No matches.");
            }
            print_matches(&matches);
        }
        "answer" => {
            let Some(clients) = clients else {
                anyhow::bail!("`answer` needs llm.api_key (or APP_LLM__API_KEY)");
            };
            let agent = RagAgent::new(Arc::new(clients.answer), Arc::new(clients.utility), vec![retriever], SYSTEM_PROMPT)
                .with_query_expansion(settings.query_expansion);
            let answer = tokio::time::timeout(Duration::from_secs(120), agent.answer(QueryWithContext { query, history: vec![] }))
                .await??;
            println!("{}\n\nSources:", answer.content.trim());
            print_matches(&answer.sources);
        }
        _ => { eprintln!("Unknown command: {}", cmd); std::process::exit(1); }
    }
    Ok(())
}
