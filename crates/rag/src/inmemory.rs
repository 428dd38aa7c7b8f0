//! In-memory vector store.
//!
//! Brute-force cosine search over a map guarded by an async lock. Used
//! in tests and for small local corpora where running Qdrant is not
//! worth the setup.

use crate::store::{SearchRequest, VectorStore};
use crate::types::{DocumentChunk, RetrievalResult, RetrievedChunk};
use async_trait::async_trait;
use docbot_core::{AppError, AppResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

struct StoredPoint {
    vector: Vec<f32>,
    text: String,
    source: HashMap<String, String>,
    content_hash: String,
}

/// Vector store holding all points in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    points: RwLock<HashMap<String, StoredPoint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn ensure_collection(&self, _dimension: usize) -> AppResult<()> {
        Ok(())
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> AppResult<usize> {
        let mut points = self.points.write().await;
        for chunk in chunks {
            let vector = chunk.embedding.clone().ok_or_else(|| {
                AppError::VectorStore(format!("chunk {} has no embedding", chunk.id))
            })?;
            points.insert(
                chunk.id.clone(),
                StoredPoint {
                    vector,
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    content_hash: chunk.content_hash.clone(),
                },
            );
        }
        Ok(chunks.len())
    }

    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<RetrievalResult>> {
        let points = self.points.read().await;

        let mut scored: Vec<RetrievalResult> = points
            .values()
            .filter(|point| match &request.filter.source_equals {
                Some((key, value)) => point.source.get(key) == Some(value),
                None => true,
            })
            .map(|point| RetrievalResult {
                chunk: RetrievedChunk {
                    text: point.text.clone(),
                    source: point.source.clone(),
                    content_hash: point.content_hash.clone(),
                },
                score: cosine_similarity(&request.vector, &point.vector),
            })
            .filter(|result| match request.score_threshold {
                Some(threshold) => result.score >= threshold,
                None => true,
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(request.limit);
        Ok(scored)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.points.read().await.len() as u64)
    }

    async fn drop_collection(&self) -> AppResult<()> {
        self.points.write().await.clear();
        Ok(())
    }
}
