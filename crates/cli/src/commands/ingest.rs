//! `docbot ingest` command.

use super::{build_embedder, build_store};
use docbot_core::{AppConfig, AppResult};
use docbot_rag::{Chunker, Ingestor};
use std::path::PathBuf;

pub async fn run(config: AppConfig, paths: &[PathBuf], reset: bool) -> AppResult<()> {
    let chunker = Chunker::new(
        config.rag.chunk_size,
        config.rag.chunk_overlap,
        config.rag.min_chunk_size,
    );
    let embedder = build_embedder(&config)?;
    let store = build_store(&config)?;

    if reset {
        store.drop_collection().await?;
    }

    let ingestor = Ingestor::new(chunker, embedder, store);
    let stats = ingestor.ingest(paths).await?;

    // Stats on stdout, logs on stderr
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
