//! Qdrant-backed vector store.

use crate::store::{SearchRequest, VectorStore};
use crate::types::{DocumentChunk, RetrievalResult, RetrievedChunk};
use async_trait::async_trait;
use docbot_core::{AppError, AppResult};
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use std::collections::HashMap;

/// Vector store over a Qdrant collection with cosine distance.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect to a Qdrant instance at `url` (gRPC port).
    pub fn connect(url: &str, collection: impl Into<String>) -> AppResult<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| store_error("failed to connect to qdrant", e))?;
        Ok(Self {
            client,
            collection: collection.into(),
        })
    }

    fn chunk_payload(chunk: &DocumentChunk) -> AppResult<Payload> {
        let json = serde_json::json!({
            "text": chunk.text,
            "source": chunk.source,
            "content_hash": chunk.content_hash,
            "token_count": chunk.token_count,
        });
        Payload::try_from(json).map_err(|e| store_error("invalid payload", e))
    }
}

/// Map a qdrant client failure to an AppError.
///
/// Connection-level failures and rate limiting are transient; protocol
/// and payload errors are not.
fn store_error(context: &str, e: QdrantError) -> AppError {
    let message = format!("{}: {}", context, e);
    match e {
        QdrantError::ResourceExhaustedError { .. } => AppError::RateLimited(message),
        QdrantError::Io(_) => AppError::Network(message),
        QdrantError::Reqwest(err) if err.is_timeout() || err.is_connect() => {
            AppError::Network(message)
        }
        _ => AppError::VectorStore(message),
    }
}

fn string_value(value: &Value) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn source_map(value: Option<&Value>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(Value {
        kind: Some(Kind::StructValue(fields)),
    }) = value
    {
        for (key, val) in &fields.fields {
            if let Some(s) = string_value(val) {
                map.insert(key.clone(), s);
            }
        }
    }
    map
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend_name(&self) -> &str {
        "qdrant"
    }

    async fn ensure_collection(&self, dimension: usize) -> AppResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| store_error("collection check failed", e))?;
        if exists {
            return Ok(());
        }

        tracing::info!(collection = %self.collection, dimension, "creating collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| store_error("create collection failed", e))?;
        Ok(())
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> AppResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = chunk.embedding.clone().ok_or_else(|| {
                AppError::VectorStore(format!("chunk {} has no embedding", chunk.id))
            })?;
            points.push(PointStruct::new(
                chunk.id.clone(),
                embedding,
                Self::chunk_payload(chunk)?,
            ));
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| store_error("upsert failed", e))?;

        tracing::debug!(points = count, collection = %self.collection, "upserted points");
        Ok(count)
    }

    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<RetrievalResult>> {
        let mut builder = SearchPointsBuilder::new(
            &self.collection,
            request.vector.clone(),
            request.limit as u64,
        )
        .with_payload(true);

        if let Some(threshold) = request.score_threshold {
            builder = builder.score_threshold(threshold);
        }
        if let Some((key, value)) = &request.filter.source_equals {
            builder = builder.filter(Filter::must([Condition::matches(
                format!("source.{}", key),
                value.clone(),
            )]));
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| store_error("search failed", e))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .get("text")
                    .and_then(string_value)
                    .unwrap_or_default();
                let content_hash = point
                    .payload
                    .get("content_hash")
                    .and_then(string_value)
                    .unwrap_or_default();
                let source = source_map(point.payload.get("source"));
                RetrievalResult {
                    chunk: RetrievedChunk {
                        text,
                        source,
                        content_hash,
                    },
                    score: point.score,
                }
            })
            .collect();

        Ok(results)
    }

    async fn count(&self) -> AppResult<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| store_error("count failed", e))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn drop_collection(&self) -> AppResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| store_error("collection check failed", e))?;
        if !exists {
            return Ok(());
        }

        tracing::info!(collection = %self.collection, "dropping collection");
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| store_error("drop collection failed", e))?;
        Ok(())
    }
}
