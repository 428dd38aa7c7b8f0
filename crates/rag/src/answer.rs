//! Answer generation.
//!
//! Builds a grounded prompt from retrieved chunks and streams the model
//! response as a sequence of [`AnswerEvent`]s. The stream is pull-based;
//! dropping it cancels the in-flight completion.

use crate::types::{RetrievalResult, SourceRef};
use docbot_llm::{ChatMessage, Completer, CompletionRequest};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

const SNIPPET_CHARS: usize = 160;

const SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer questions using only \
the provided context. Be concise and cite which source supports each claim when it matters. \
If the context does not contain the answer, say so plainly instead of guessing.";

const NO_CONTEXT_NOTE: &str = "No relevant documentation was found for this question. Tell \
the user you could not find supporting documentation and suggest they rephrase or consult \
the full docs.";

/// Events produced while answering a question, in order: one `Sources`,
/// zero or more `Delta`s, then exactly one of `Done` or `Error`.
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    /// Source references backing the forthcoming answer
    Sources(Vec<SourceRef>),

    /// Incremental answer text
    Delta(String),

    /// Terminal event carrying the complete assembled answer
    Done { answer: String },

    /// Terminal event on failure
    Error { message: String },
}

/// Type alias for the event stream returned by [`AnswerStreamer`].
pub type AnswerStream = Pin<Box<dyn Stream<Item = AnswerEvent> + Send>>;

/// Streams grounded answers from retrieved context.
pub struct AnswerStreamer {
    completer: Arc<dyn Completer>,
    model: String,
}

impl AnswerStreamer {
    pub fn new(completer: Arc<dyn Completer>, model: impl Into<String>) -> Self {
        Self {
            completer,
            model: model.into(),
        }
    }

    /// Stream an answer to `question` grounded in `results`.
    ///
    /// `selected_text` is text the user highlighted on the page, included
    /// as additional context when present. The stream always begins with
    /// a `Sources` event, even when no chunks were retrieved.
    pub fn answer(
        &self,
        question: &str,
        selected_text: Option<&str>,
        results: Vec<RetrievalResult>,
    ) -> AnswerStream {
        let sources = source_refs(&results);
        let request = CompletionRequest::new(
            build_messages(question, selected_text, &results),
            &self.model,
        )
        .with_streaming();
        let completer = Arc::clone(&self.completer);

        Box::pin(async_stream::stream! {
            yield AnswerEvent::Sources(sources);

            let mut upstream = match completer.stream(&request).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "completion stream failed to start");
                    yield AnswerEvent::Error { message: e.to_string() };
                    return;
                }
            };

            let mut answer = String::new();
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(chunk) => {
                        if !chunk.content.is_empty() {
                            answer.push_str(&chunk.content);
                            yield AnswerEvent::Delta(chunk.content);
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "completion stream failed mid-answer");
                        yield AnswerEvent::Error { message: e.to_string() };
                        return;
                    }
                }
            }

            yield AnswerEvent::Done { answer };
        })
    }
}

fn source_refs(results: &[RetrievalResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|result| SourceRef {
            source: display_source(result),
            score: result.score,
            snippet: snippet(&result.chunk.text),
        })
        .collect()
}

fn display_source(result: &RetrievalResult) -> String {
    result
        .chunk
        .source
        .get("path")
        .or_else(|| result.chunk.source.get("title"))
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_CHARS {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

fn build_messages(
    question: &str,
    selected_text: Option<&str>,
    results: &[RetrievalResult],
) -> Vec<ChatMessage> {
    let mut context = String::new();
    if results.is_empty() {
        context.push_str(NO_CONTEXT_NOTE);
    } else {
        context.push_str("Context:\n\n");
        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] (source: {})\n{}\n\n",
                i + 1,
                display_source(result),
                result.chunk.text
            ));
        }
    }

    let mut user = String::new();
    if let Some(selected) = selected_text.filter(|s| !s.trim().is_empty()) {
        user.push_str(&format!(
            "The user highlighted this passage on the page:\n\"{}\"\n\n",
            selected.trim()
        ));
    }
    user.push_str(&format!("{}\n\nQuestion: {}", context, question));

    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}
