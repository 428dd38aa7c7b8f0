//! Chat endpoint.
//!
//! Accepts a question and streams the answer back over server-sent
//! events. Event order on the wire: `start`, zero or more `chunk`s, then
//! `final` and `done` on success or a single `error` on failure.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use docbot_rag::{AnswerEvent, SourceRef};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    pub question: String,

    /// Client-chosen conversation identifier, echoed in the start event
    #[serde(default)]
    pub session_id: Option<String>,

    /// Text the user highlighted on the page, if any
    #[serde(default)]
    pub selected_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// POST /api/chat
///
/// Rejects blank questions with 400 before any model or store call is
/// made. Once the SSE stream starts, failures surface as an `error`
/// event rather than an HTTP status.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorBody>)> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "question must not be empty".to_string(),
            }),
        ));
    }

    let session_id = request
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let selected_text = request.selected_text;

    tracing::info!(session_id = %session_id, "chat question received");

    let stream = answer_events(state, question, session_id, selected_text);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn answer_events(
    state: AppState,
    question: String,
    session_id: String,
    selected_text: Option<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    use futures::StreamExt;

    async_stream::stream! {
        yield sse_event("start", json!({ "session_id": session_id }));

        let results = match state.retriever.retrieve(&question).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed");
                yield sse_event("error", json!({ "message": e.to_string() }));
                return;
            }
        };

        let mut events = state
            .streamer
            .answer(&question, selected_text.as_deref(), results);

        let mut sources: Vec<SourceRef> = Vec::new();
        while let Some(event) = events.next().await {
            match event {
                AnswerEvent::Sources(s) => {
                    sources = s;
                }
                AnswerEvent::Delta(content) => {
                    yield sse_event("chunk", json!({ "content": content }));
                }
                AnswerEvent::Done { answer } => {
                    yield sse_event("final", json!({ "answer": answer, "sources": sources }));
                    yield sse_event("done", json!({}));
                    return;
                }
                AnswerEvent::Error { message } => {
                    yield sse_event("error", json!({ "message": message }));
                    return;
                }
            }
        }
    }
}

/// Build an SSE event tagged both ways: the SSE `event:` field for
/// EventSource listeners and a `type` field inside the JSON payload for
/// clients that read the data alone.
fn sse_event(kind: &str, mut data: serde_json::Value) -> Result<Event, Infallible> {
    if let Some(object) = data.as_object_mut() {
        object.insert(
            "type".to_string(),
            serde_json::Value::String(kind.to_string()),
        );
    }
    Ok(Event::default().event(kind).data(data.to_string()))
}
