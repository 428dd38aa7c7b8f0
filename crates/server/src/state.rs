//! Shared server state.

use docbot_rag::{AnswerStreamer, Retriever};
use std::sync::Arc;

/// State shared across request handlers.
///
/// All components are constructed once at startup and shared; handlers
/// only ever read through the `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<Retriever>,
    pub streamer: Arc<AnswerStreamer>,
}

impl AppState {
    pub fn new(retriever: Arc<Retriever>, streamer: Arc<AnswerStreamer>) -> Self {
        Self {
            retriever,
            streamer,
        }
    }
}
