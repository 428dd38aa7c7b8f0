//! Error types for docbot.
//!
//! This module defines a unified error enum covering all error categories
//! in the application: configuration, I/O, embedding, vector store, LLM,
//! and ingestion errors.

use thiserror::Error;

/// Unified error type for docbot.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request rejected before any external call was made
    #[error("Invalid input: {0}")]
    Input(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Upstream rate limit; retryable
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Timeout or connection failure reaching an upstream; retryable
    #[error("Network error: {0}")]
    Network(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// LLM completion errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a retry of the failed operation could plausibly succeed.
    ///
    /// Rate limits, timeouts, and connectivity failures are transient;
    /// bad input, bad configuration, and auth failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited(_) | AppError::Network(_) | AppError::Io(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
