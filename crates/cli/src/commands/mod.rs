//! CLI subcommands and shared component wiring.

pub mod ingest;
pub mod query;
pub mod serve;
pub mod stats;

use docbot_core::{AppConfig, AppResult, RetryPolicy};
use docbot_rag::providers::OpenAiEmbeddingProvider;
use docbot_rag::{Embedder, QdrantStore, Retriever, RetrieverOptions, VectorStore};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn build_embedder(config: &AppConfig) -> AppResult<Arc<Embedder>> {
    let api_key = config.resolve_api_key()?;
    let provider = Arc::new(OpenAiEmbeddingProvider::with_base_url(
        api_key,
        &config.openai.embedding_model,
        config.openai.embedding_dim,
        &config.openai.endpoint,
    ));
    Ok(Arc::new(Embedder::new(
        provider,
        config.rag.batch_size,
        Duration::from_millis(config.rag.batch_delay_ms),
        RetryPolicy::from_settings(&config.retry),
    )))
}

pub(crate) fn build_store(config: &AppConfig) -> AppResult<Arc<dyn VectorStore>> {
    let store = QdrantStore::connect(&config.qdrant.url, &config.qdrant.collection)?;
    Ok(Arc::new(store))
}

pub(crate) fn build_retriever(
    config: &AppConfig,
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: Option<usize>,
) -> Retriever {
    Retriever::new(
        embedder,
        store,
        RetrieverOptions {
            top_k: top_k.unwrap_or(config.rag.top_k),
            fetch_multiplier: config.rag.fetch_multiplier,
            score_threshold: config.rag.score_threshold,
            retry: RetryPolicy::from_settings(&config.retry),
        },
    )
}
