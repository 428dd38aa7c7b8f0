//! OpenAI-compatible chat completion provider.
//!
//! Talks to any endpoint implementing the OpenAI `/chat/completions`
//! contract. Streaming responses arrive as server-sent events, one
//! `data: {json}` line per delta, terminated by `data: [DONE]`.

use crate::client::{
    ChatMessage, Completer, CompletionChunk, CompletionRequest, CompletionResponse,
    CompletionStream,
};
use docbot_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// OpenAI API request format.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// OpenAI API response format (non-streaming).
#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

/// One streamed SSE payload.
#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    choices: Vec<ApiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    delta: ApiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible completion client.
pub struct OpenAiCompleter {
    /// Base URL for the API (e.g., "https://api.openai.com/v1")
    base_url: String,

    /// Bearer token
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiCompleter {
    /// Create a new client against the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    /// Create a new client with a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_api_request<'a>(&self, request: &'a CompletionRequest, stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    /// Map a failed request dispatch to an AppError.
    ///
    /// Timeouts and connection failures are transient; anything else is
    /// a malformed request on our side.
    fn request_error(context: &str, e: reqwest::Error) -> AppError {
        if e.is_timeout() || e.is_connect() {
            AppError::Network(format!("{}: {}", context, e))
        } else {
            AppError::Llm(format!("{}: {}", context, e))
        }
    }

    /// Map a non-success HTTP status to an AppError.
    ///
    /// 429 is classified as transient so the shared retry policy can act
    /// on it; everything else is permanent.
    async fn status_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            AppError::RateLimited(format!("completion API: {}", error_text))
        } else {
            AppError::Llm(format!("API error ({}): {}", status, error_text))
        }
    }
}

#[async_trait::async_trait]
impl Completer for OpenAiCompleter {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        tracing::debug!(model = %request.model, "sending completion request");

        let api_request = self.to_api_request(request, false);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Self::request_error("Failed to send completion request", e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse completion response: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Llm("Completion response had no choices".to_string()))?;

        Ok(CompletionResponse {
            content,
            model: api_response.model,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> AppResult<CompletionStream> {
        tracing::debug!(model = %request.model, "starting streaming completion");

        let api_request = self.to_api_request(request, true);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Self::request_error("Failed to send streaming request", e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let mut bytes = response.bytes_stream();

        // SSE payloads can be split across network reads, so carry a line
        // buffer between chunks instead of parsing each read in isolation.
        let stream = async_stream::stream! {
            let mut buffer = String::new();

            while let Some(result) = bytes.next().await {
                let chunk = match result {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(AppError::Llm(format!("Stream error: {}", e)));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();

                    if payload == "[DONE]" {
                        yield Ok(CompletionChunk { content: String::new(), done: true });
                        return;
                    }

                    match serde_json::from_str::<ApiStreamChunk>(payload) {
                        Ok(parsed) => {
                            if let Some(choice) = parsed.choices.into_iter().next() {
                                let content = choice.delta.content.unwrap_or_default();
                                let done = choice.finish_reason.is_some();
                                if !content.is_empty() || done {
                                    yield Ok(CompletionChunk { content, done });
                                }
                            }
                        }
                        Err(e) => {
                            yield Err(AppError::Llm(format!("Failed to parse chunk: {}", e)));
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completer_creation() {
        let client = OpenAiCompleter::new("sk-test");
        assert_eq!(client.provider_name(), "openai");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_api_request_conversion() {
        let client = OpenAiCompleter::new("sk-test");
        let request = CompletionRequest::new(
            vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
            "gpt-4o-mini",
        )
        .with_temperature(0.3)
        .with_max_tokens(512);

        let api_req = client.to_api_request(&request, true);
        assert_eq!(api_req.model, "gpt-4o-mini");
        assert_eq!(api_req.messages.len(), 2);
        assert_eq!(api_req.temperature, Some(0.3));
        assert_eq!(api_req.max_tokens, Some(512));
        assert!(api_req.stream);
    }

    #[test]
    fn test_stream_chunk_parsing() {
        let payload = r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let parsed: ApiStreamChunk = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Hel"));
        assert!(parsed.choices[0].finish_reason.is_none());

        let final_payload = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let parsed: ApiStreamChunk = serde_json::from_str(final_payload).unwrap();
        assert!(parsed.choices[0].delta.content.is_none());
        assert_eq!(parsed.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
