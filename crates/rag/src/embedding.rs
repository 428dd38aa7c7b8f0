//! Embedding generation.
//!
//! The [`EmbeddingProvider`] trait abstracts over embedding backends; the
//! [`Embedder`] wrapper adds batching, pacing between batches, and retry
//! with exponential backoff for transient failures.

use crate::types::DocumentChunk;
use async_trait::async_trait;
use docbot_core::{AppError, AppResult, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Backend that turns text into embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider identifier for logging
    fn provider_name(&self) -> &str;

    /// Dimensionality of the vectors this provider produces
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;
}

/// Batched embedding front-end.
///
/// Splits work into provider-sized batches, pauses between consecutive
/// batches to respect rate limits, and retries transient failures.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    batch_delay: Duration,
    retry: RetryPolicy,
}

impl Embedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        batch_delay: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            batch_delay,
            retry,
        }
    }

    /// Vector dimensionality of the underlying provider.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed all chunks in place.
    ///
    /// Fails as a whole if any batch fails after retries are exhausted;
    /// the error names the failing batch. On success every chunk has its
    /// embedding populated.
    pub async fn embed_chunks(&self, chunks: &mut [DocumentChunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let total_batches = chunks.len().div_ceil(self.batch_size);
        tracing::info!(
            chunks = chunks.len(),
            batches = total_batches,
            provider = self.provider.provider_name(),
            "embedding chunks"
        );

        for (batch_index, batch) in chunks.chunks_mut(self.batch_size).enumerate() {
            if batch_index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let provider = Arc::clone(&self.provider);

            let vectors = self
                .retry
                .run(|| {
                    let texts = texts.clone();
                    let provider = Arc::clone(&provider);
                    async move { provider.embed_batch(&texts).await }
                })
                .await
                .map_err(|e| {
                    AppError::Embedding(format!(
                        "batch {}/{} failed: {}",
                        batch_index + 1,
                        total_batches,
                        e
                    ))
                })?;

            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "batch {}/{} returned {} vectors for {} inputs",
                    batch_index + 1,
                    total_batches,
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter_mut().zip(vectors) {
                chunk.embedding = Some(vector);
            }

            tracing::debug!(
                batch = batch_index + 1,
                of = total_batches,
                "embedded batch"
            );
        }

        Ok(())
    }

    /// Embed a single query string. Empty input is rejected.
    pub async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        if query.trim().is_empty() {
            return Err(AppError::Input("cannot embed empty text".to_string()));
        }
        let texts = vec![query.to_string()];
        let provider = Arc::clone(&self.provider);

        let mut vectors = self
            .retry
            .run(|| {
                let texts = texts.clone();
                let provider = Arc::clone(&provider);
                async move { provider.embed_batch(&texts).await }
            })
            .await?;

        vectors
            .pop()
            .ok_or_else(|| AppError::Embedding("provider returned no vector for query".to_string()))
    }
}
