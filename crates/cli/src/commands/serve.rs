//! `docbot serve` command.

use super::{build_embedder, build_retriever, build_store};
use docbot_core::{AppConfig, AppResult};
use docbot_llm::create_completer;
use docbot_rag::AnswerStreamer;
use docbot_server::{router, AppState};
use std::sync::Arc;

pub async fn run(config: AppConfig) -> AppResult<()> {
    let embedder = build_embedder(&config)?;
    let store = build_store(&config)?;
    let retriever = Arc::new(build_retriever(&config, embedder, store, None));

    let api_key = config.resolve_api_key()?;
    let completer = create_completer("openai", &config.openai.endpoint, &api_key)?;
    let streamer = Arc::new(AnswerStreamer::new(completer, &config.openai.chat_model));

    tracing::info!(
        bind = %config.server.bind,
        collection = %config.qdrant.collection,
        model = %config.openai.chat_model,
        "starting server"
    );

    let app = router(
        AppState::new(retriever, streamer),
        &config.server.allowed_origins,
    );
    docbot_server::serve(&config.server.bind, app).await
}
