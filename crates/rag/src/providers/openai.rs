//! OpenAI embedding provider.

use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use docbot_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding client for the OpenAI `/embeddings` endpoint.
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self::with_base_url(api_key, model, dimension, "https://api.openai.com/v1")
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // Timeouts and connection failures are worth a retry;
                // anything else is a malformed request on our side
                if e.is_timeout() || e.is_connect() {
                    AppError::Network(format!("embedding request failed: {}", e))
                } else {
                    AppError::Embedding(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(AppError::RateLimited(format!(
                    "embedding API rate limited: {}",
                    body
                )));
            }
            return Err(AppError::Embedding(format!(
                "embedding API error {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("invalid response: {}", e)))?;

        // The API documents input order but indexes are authoritative
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let provider = OpenAiEmbeddingProvider::with_base_url(
            "sk-test",
            "text-embedding-3-small",
            1536,
            "http://localhost:8080/v1/",
        );
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_dimension_reported() {
        let provider = OpenAiEmbeddingProvider::new("sk-test", "text-embedding-3-small", 1536);
        assert_eq!(provider.dimension(), 1536);
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_response_ordering_by_index() {
        let json = r#"{"data":[
            {"index":1,"embedding":[0.2]},
            {"index":0,"embedding":[0.1]}
        ]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        assert_eq!(data[0].embedding, vec![0.1]);
        assert_eq!(data[1].embedding, vec![0.2]);
    }
}
