//! Query-time retrieval.
//!
//! Embeds the query, over-fetches from the vector store, deduplicates by
//! content hash, and returns the best remaining matches.

use crate::embedding::Embedder;
use crate::store::{SearchFilter, SearchRequest, VectorStore};
use crate::types::RetrievalResult;
use docbot_core::{AppError, AppResult, RetryPolicy};
use std::collections::HashSet;
use std::sync::Arc;

/// Retrieval settings.
#[derive(Debug, Clone)]
pub struct RetrieverOptions {
    /// Number of chunks to return
    pub top_k: usize,

    /// Over-fetch factor; the store is asked for `top_k * fetch_multiplier`
    /// candidates so deduplication does not starve the result set
    pub fetch_multiplier: usize,

    /// Minimum similarity score for a candidate to be considered
    pub score_threshold: f32,

    /// Retry policy for the store search; search is idempotent so
    /// transient failures are safe to retry here
    pub retry: RetryPolicy,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            fetch_multiplier: 2,
            score_threshold: 0.7,
            retry: RetryPolicy::default(),
        }
    }
}

/// Retrieves relevant chunks for a question.
pub struct Retriever {
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStore>,
    options: RetrieverOptions,
}

impl Retriever {
    pub fn new(
        embedder: Arc<Embedder>,
        store: Arc<dyn VectorStore>,
        options: RetrieverOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            options,
        }
    }

    /// Retrieve up to `top_k` deduplicated chunks relevant to the query.
    ///
    /// An empty result is not an error; it signals that no stored content
    /// clears the score threshold.
    pub async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievalResult>> {
        self.retrieve_filtered(query, SearchFilter::default()).await
    }

    /// Like [`Retriever::retrieve`], restricted by a metadata filter.
    pub async fn retrieve_filtered(
        &self,
        query: &str,
        filter: SearchFilter,
    ) -> AppResult<Vec<RetrievalResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Input("query must not be empty".to_string()));
        }

        let vector = self.embedder.embed_query(query).await?;

        let fetch_limit = self.options.top_k * self.options.fetch_multiplier.max(1);
        let request = SearchRequest::new(vector, fetch_limit)
            .with_score_threshold(self.options.score_threshold)
            .with_filter(filter);

        let store = Arc::clone(&self.store);
        let candidates = self
            .options
            .retry
            .run(|| {
                let store = Arc::clone(&store);
                let request = request.clone();
                async move { store.search(&request).await }
            })
            .await?;
        let fetched = candidates.len();

        // Candidates arrive best-first, so keeping the first occurrence
        // of each hash keeps the highest-scoring duplicate.
        let mut seen: HashSet<String> = HashSet::new();
        let mut results: Vec<RetrievalResult> = Vec::with_capacity(self.options.top_k);
        for candidate in candidates {
            if seen.insert(candidate.chunk.content_hash.clone()) {
                results.push(candidate);
                if results.len() == self.options.top_k {
                    break;
                }
            }
        }

        tracing::debug!(
            fetched,
            returned = results.len(),
            top_k = self.options.top_k,
            "retrieval complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::inmemory::InMemoryStore;
    use crate::providers::MockEmbeddingProvider;
    use crate::types::DocumentChunk;
    use docbot_core::RetryPolicy;
    use std::collections::HashMap;
    use std::time::Duration;

    fn embedder() -> Arc<Embedder> {
        Arc::new(Embedder::new(
            Arc::new(MockEmbeddingProvider::new(64)),
            100,
            Duration::ZERO,
            RetryPolicy::default(),
        ))
    }

    async fn store_with_texts(texts: &[&str]) -> Arc<InMemoryStore> {
        let provider = MockEmbeddingProvider::new(64);
        let store = InMemoryStore::new();
        let mut chunks: Vec<DocumentChunk> = texts
            .iter()
            .map(|t| DocumentChunk::new(t.to_string(), HashMap::new()))
            .collect();
        let inputs: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = provider.embed_batch(&inputs).await.unwrap();
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = Some(vector);
        }
        store.upsert(&chunks).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_any_lookup() {
        let store = Arc::new(InMemoryStore::new());
        let retriever = Retriever::new(embedder(), store, RetrieverOptions::default());
        let err = retriever.retrieve("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[tokio::test]
    async fn test_exact_match_retrieved_first() {
        let store = store_with_texts(&[
            "the lidar sensor scans at twenty hertz during missions",
            "battery charging follows a three stage curve",
            "firmware updates are applied over the air",
        ])
        .await;

        let options = RetrieverOptions {
            score_threshold: 0.2,
            ..RetrieverOptions::default()
        };
        let retriever = Retriever::new(embedder(), store, options);
        let results = retriever
            .retrieve("the lidar sensor scans at twenty hertz during missions")
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(results[0].chunk.text.contains("lidar"));
    }

    #[tokio::test]
    async fn test_duplicate_content_collapsed() {
        // Same normalized content under different formatting: one id, and
        // even if stored under distinct sources the hash dedup collapses it
        let store = Arc::new(InMemoryStore::new());
        let provider = MockEmbeddingProvider::new(64);

        let mut source_a = HashMap::new();
        source_a.insert("path".to_string(), "a.md".to_string());
        let mut source_b = HashMap::new();
        source_b.insert("path".to_string(), "b.md".to_string());

        let text = "identical troubleshooting steps for the charging dock";
        let mut chunk_a = DocumentChunk::new(text.to_string(), source_a);
        let mut chunk_b = DocumentChunk::new(
            "IDENTICAL  troubleshooting steps for the charging dock".to_string(),
            source_b,
        );
        // Distinct ids for the test by forcing different point ids
        chunk_b.id = "00000000-0000-0000-0000-00000000000b".to_string();

        let vectors = provider
            .embed_batch(&[chunk_a.text.clone(), chunk_b.text.clone()])
            .await
            .unwrap();
        chunk_a.embedding = Some(vectors[0].clone());
        chunk_b.embedding = Some(vectors[1].clone());
        store.upsert(&[chunk_a, chunk_b]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let options = RetrieverOptions {
            score_threshold: 0.2,
            ..RetrieverOptions::default()
        };
        let retriever = Retriever::new(embedder(), store, options);
        let results = retriever.retrieve(text).await.unwrap();

        let hashes: Vec<&str> = results
            .iter()
            .map(|r| r.chunk.content_hash.as_str())
            .collect();
        let unique: HashSet<&str> = hashes.iter().copied().collect();
        assert_eq!(hashes.len(), unique.len());
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_no_match_above_threshold_returns_empty() {
        let store = store_with_texts(&["completely unrelated gardening advice"]).await;
        let options = RetrieverOptions {
            score_threshold: 0.95,
            ..RetrieverOptions::default()
        };
        let retriever = Retriever::new(embedder(), store, options);
        let results = retriever
            .retrieve("how do I calibrate the lidar sensor")
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_filtered_retrieval_restricts_to_source() {
        let store = Arc::new(InMemoryStore::new());
        let provider = MockEmbeddingProvider::new(64);

        let text = "sensor calibration requires a level surface";
        let mut chunks = Vec::new();
        for (suffix, path) in [("guide", "a.md"), ("manual", "b.md")] {
            let mut source = HashMap::new();
            source.insert("path".to_string(), path.to_string());
            let mut chunk = DocumentChunk::new(format!("{} {}", text, suffix), source);
            let vectors = provider.embed_batch(&[chunk.text.clone()]).await.unwrap();
            chunk.embedding = Some(vectors[0].clone());
            chunks.push(chunk);
        }
        store.upsert(&chunks).await.unwrap();

        let options = RetrieverOptions {
            score_threshold: 0.0,
            ..RetrieverOptions::default()
        };
        let retriever = Retriever::new(embedder(), store, options);
        let results = retriever
            .retrieve_filtered(
                text,
                SearchFilter {
                    source_equals: Some(("path".to_string(), "b.md".to_string())),
                },
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].chunk.source.get("path").map(String::as_str),
            Some("b.md")
        );
    }

    #[tokio::test]
    async fn test_result_count_capped_at_top_k() {
        let texts: Vec<String> = (0..12)
            .map(|i| format!("sensor calibration guide part {} with unique details", i))
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let store = store_with_texts(&refs).await;

        let options = RetrieverOptions {
            top_k: 4,
            fetch_multiplier: 2,
            score_threshold: 0.0,
            ..RetrieverOptions::default()
        };
        let retriever = Retriever::new(embedder(), store, options);
        let results = retriever
            .retrieve("sensor calibration guide")
            .await
            .unwrap();
        assert!(results.len() <= 4);
    }

    /// Store whose first `failures` searches fail with a transient error.
    struct FlakyStore {
        inner: InMemoryStore,
        failures: std::sync::atomic::AtomicU32,
    }

    #[async_trait::async_trait]
    impl VectorStore for FlakyStore {
        fn backend_name(&self) -> &str {
            "flaky"
        }

        async fn ensure_collection(&self, dimension: usize) -> AppResult<()> {
            self.inner.ensure_collection(dimension).await
        }

        async fn upsert(&self, chunks: &[DocumentChunk]) -> AppResult<usize> {
            self.inner.upsert(chunks).await
        }

        async fn search(&self, request: &SearchRequest) -> AppResult<Vec<RetrievalResult>> {
            use std::sync::atomic::Ordering;
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(AppError::Network("connection reset".to_string()));
            }
            self.inner.search(request).await
        }

        async fn count(&self) -> AppResult<u64> {
            self.inner.count().await
        }

        async fn drop_collection(&self) -> AppResult<()> {
            self.inner.drop_collection().await
        }
    }

    #[tokio::test]
    async fn test_search_retried_after_transient_failure() {
        let provider = MockEmbeddingProvider::new(64);
        let inner = InMemoryStore::new();
        let mut chunk = DocumentChunk::new(
            "the lidar sensor scans at twenty hertz".to_string(),
            HashMap::new(),
        );
        let vectors = provider.embed_batch(&[chunk.text.clone()]).await.unwrap();
        chunk.embedding = Some(vectors[0].clone());
        inner.upsert(&[chunk]).await.unwrap();

        let store = Arc::new(FlakyStore {
            inner,
            failures: std::sync::atomic::AtomicU32::new(1),
        });

        let options = RetrieverOptions {
            score_threshold: 0.2,
            retry: RetryPolicy::new(3, Duration::ZERO, 2.0),
            ..RetrieverOptions::default()
        };
        let retriever = Retriever::new(embedder(), Arc::clone(&store) as Arc<dyn VectorStore>, options);

        let results = retriever
            .retrieve("the lidar sensor scans at twenty hertz")
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(store.failures.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
