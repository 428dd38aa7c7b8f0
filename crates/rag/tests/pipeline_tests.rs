//! End-to-end pipeline tests over the in-memory store and the mock
//! embedding provider: ingest a small corpus, retrieve, and stream an
//! answer without any network dependency.

use async_trait::async_trait;
use docbot_core::{AppResult, RetryPolicy};
use docbot_llm::{
    ChatMessage, Completer, CompletionChunk, CompletionRequest, CompletionResponse,
    CompletionStream,
};
use docbot_rag::{
    AnswerEvent, AnswerStreamer, Chunker, Embedder, InMemoryStore, Ingestor, Retriever,
    RetrieverOptions,
};
use futures::StreamExt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct EchoCompleter;

#[async_trait]
impl Completer for EchoCompleter {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        Ok(CompletionResponse {
            content: echo_answer(&request.messages),
            model: "echo".to_string(),
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> AppResult<CompletionStream> {
        let answer = echo_answer(&request.messages);
        Ok(Box::pin(async_stream::stream! {
            for word in answer.split_inclusive(' ') {
                yield Ok(CompletionChunk {
                    content: word.to_string(),
                    done: false,
                });
            }
            yield Ok(CompletionChunk { content: String::new(), done: true });
        }))
    }
}

// Answers with a fixed sentence depending on whether context was found,
// enough to assert the event protocol end to end.
fn echo_answer(messages: &[ChatMessage]) -> String {
    let user = messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    if user.contains("Context:") {
        "Answer grounded in the documentation context.".to_string()
    } else {
        "No documentation found.".to_string()
    }
}

fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn embedder() -> Arc<Embedder> {
    Arc::new(Embedder::new(
        Arc::new(docbot_rag::providers::MockEmbeddingProvider::new(64)),
        100,
        Duration::ZERO,
        RetryPolicy::default(),
    ))
}

#[tokio::test]
async fn ingest_then_retrieve_finds_the_relevant_chunk() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "sensors.md",
        &"The lidar sensor scans the environment twenty times per second during missions. "
            .repeat(8),
    );
    write_file(
        dir.path(),
        "battery.md",
        &"Battery charging follows a three stage curve ending with a trickle phase. ".repeat(8),
    );

    let store = Arc::new(InMemoryStore::new());
    let embedder = embedder();
    let ingestor = Ingestor::new(
        Chunker::new(200, 20, 5),
        Arc::clone(&embedder),
        Arc::clone(&store) as Arc<dyn docbot_rag::VectorStore>,
    );
    let stats = ingestor.ingest_dir(dir.path()).await.unwrap();
    assert_eq!(stats.documents_processed, 2);
    assert!(stats.chunks_created >= 2);

    let retriever = Retriever::new(
        embedder,
        store,
        RetrieverOptions {
            top_k: 2,
            fetch_multiplier: 2,
            score_threshold: 0.1,
            ..RetrieverOptions::default()
        },
    );
    let results = retriever
        .retrieve("how often does the lidar sensor scan the environment")
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results[0].chunk.text.contains("lidar"));
    assert_eq!(
        results[0].chunk.source.get("path").map(String::as_str),
        Some("sensors.md")
    );
}

#[tokio::test]
async fn full_question_flow_streams_sources_then_answer() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "firmware.md",
        &"Firmware updates are applied over the air and verified with a checksum. ".repeat(8),
    );

    let store = Arc::new(InMemoryStore::new());
    let embedder = embedder();
    Ingestor::new(
        Chunker::new(200, 20, 5),
        Arc::clone(&embedder),
        Arc::clone(&store) as Arc<dyn docbot_rag::VectorStore>,
    )
    .ingest_dir(dir.path())
    .await
    .unwrap();

    let retriever = Retriever::new(
        embedder,
        store,
        RetrieverOptions {
            top_k: 4,
            fetch_multiplier: 2,
            score_threshold: 0.1,
            ..RetrieverOptions::default()
        },
    );
    let results = retriever
        .retrieve("how are firmware updates verified")
        .await
        .unwrap();
    assert!(!results.is_empty());

    let streamer = AnswerStreamer::new(Arc::new(EchoCompleter), "echo");
    let events: Vec<AnswerEvent> = streamer
        .answer("how are firmware updates verified", None, results)
        .collect()
        .await;

    // Protocol: Sources first, then deltas, then a single Done
    match &events[0] {
        AnswerEvent::Sources(sources) => {
            assert!(!sources.is_empty());
            assert_eq!(sources[0].source, "firmware.md");
            assert!(!sources[0].snippet.is_empty());
        }
        other => panic!("expected Sources first, got {:?}", other),
    }

    let deltas: String = events
        .iter()
        .filter_map(|e| match e {
            AnswerEvent::Delta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();

    match events.last().unwrap() {
        AnswerEvent::Done { answer } => {
            assert_eq!(answer, &deltas);
            assert!(answer.contains("grounded"));
        }
        other => panic!("expected Done last, got {:?}", other),
    }
}

#[tokio::test]
async fn question_with_no_matching_docs_gets_empty_sources() {
    let store = Arc::new(InMemoryStore::new());
    let retriever = Retriever::new(embedder(), store, RetrieverOptions::default());
    let results = retriever.retrieve("anything at all").await.unwrap();
    assert!(results.is_empty());

    let streamer = AnswerStreamer::new(Arc::new(EchoCompleter), "echo");
    let events: Vec<AnswerEvent> = streamer
        .answer("anything at all", None, results)
        .collect()
        .await;

    match &events[0] {
        AnswerEvent::Sources(sources) => assert!(sources.is_empty()),
        other => panic!("expected Sources, got {:?}", other),
    }
    match events.last().unwrap() {
        AnswerEvent::Done { answer } => assert!(answer.contains("No documentation")),
        other => panic!("expected Done, got {:?}", other),
    }
}
