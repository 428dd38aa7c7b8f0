//! `docbot query` command.
//!
//! Retrieval-only mode for inspecting what the pipeline would feed the
//! model, without spending completion tokens.

use super::{build_embedder, build_retriever, build_store};
use docbot_core::{AppConfig, AppResult};

pub async fn run(
    config: AppConfig,
    question: &str,
    top_k: Option<usize>,
    json: bool,
) -> AppResult<()> {
    let embedder = build_embedder(&config)?;
    let store = build_store(&config)?;
    let retriever = build_retriever(&config, embedder, store, top_k);

    let results = retriever.retrieve(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No chunks matched above the score threshold.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let source = result
            .chunk
            .source
            .get("path")
            .map(String::as_str)
            .unwrap_or("unknown");
        println!("[{}] score {:.3}  {}", i + 1, result.score, source);
        println!("{}\n", result.chunk.text);
    }
    Ok(())
}
