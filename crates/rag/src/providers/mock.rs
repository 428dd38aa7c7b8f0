//! Deterministic embedding provider for tests and offline use.

use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use docbot_core::AppResult;
use sha2::{Digest, Sha256};

/// Hash-based embeddings with no network dependency.
///
/// Vectors are deterministic in the input text and unit-normalized, so
/// identical texts are maximally similar and cosine scores stay in
/// range. Useful for pipeline tests and local smoke runs.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        // Accumulate hashed word trigrams into buckets so that texts
        // sharing vocabulary land near each other.
        let words: Vec<&str> = text.split_whitespace().collect();
        for window in words.windows(3.min(words.len().max(1))) {
            let mut hasher = Sha256::new();
            for word in window {
                hasher.update(word.to_lowercase().as_bytes());
                hasher.update(b" ");
            }
            let digest = hasher.finalize();
            let bucket =
                u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                    % self.dimension;
            let sign = if digest[4] % 2 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        } else {
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
