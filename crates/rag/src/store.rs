//! Vector store abstraction.

use crate::types::{DocumentChunk, RetrievalResult};
use async_trait::async_trait;
use docbot_core::AppResult;

/// Optional constraints applied during similarity search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict matches to points whose source metadata contains this
    /// exact key/value pair
    pub source_equals: Option<(String, String)>,
}

/// Parameters for a similarity search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Query embedding
    pub vector: Vec<f32>,

    /// Maximum number of matches to return
    pub limit: usize,

    /// Matches scoring below this are excluded
    pub score_threshold: Option<f32>,

    /// Metadata constraints
    pub filter: SearchFilter,
}

impl SearchRequest {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            limit,
            score_threshold: None,
            filter: SearchFilter::default(),
        }
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Storage backend for embedded chunks.
///
/// Implementations index vectors under cosine similarity and store the
/// chunk text, source metadata, and content hash as point payload.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend identifier for logging
    fn backend_name(&self) -> &str;

    /// Create the collection if it does not exist.
    ///
    /// Idempotent. `dimension` fixes the vector size of the collection.
    async fn ensure_collection(&self, dimension: usize) -> AppResult<()>;

    /// Insert or replace chunks by id.
    ///
    /// Chunks must carry embeddings; re-upserting an unchanged chunk
    /// replaces the existing point instead of duplicating it.
    async fn upsert(&self, chunks: &[DocumentChunk]) -> AppResult<usize>;

    /// Similarity search, best matches first.
    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<RetrievalResult>>;

    /// Number of points currently stored.
    async fn count(&self) -> AppResult<u64>;

    /// Remove the collection and all of its points.
    ///
    /// Idempotent; a missing collection is not an error.
    async fn drop_collection(&self) -> AppResult<()>;
}
