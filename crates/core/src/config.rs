//! Configuration management for docbot.
//!
//! This module handles loading and merging configuration from multiple
//! sources, in increasing order of precedence:
//! - Built-in defaults
//! - Config file (docbot.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Every tunable of the retrieval pipeline (chunk sizes, over-fetch
//! multiplier, score threshold, batch limits) lives here rather than as a
//! constant, so deployments can adjust them without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Log level override
    #[serde(skip)]
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    #[serde(skip)]
    pub verbose: bool,

    /// Disable colored output
    #[serde(skip)]
    pub no_color: bool,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// OpenAI-compatible API settings (embeddings + completions)
    #[serde(default)]
    pub openai: OpenAiSettings,

    /// Qdrant vector database settings
    #[serde(default)]
    pub qdrant: QdrantSettings,

    /// Retrieval pipeline settings
    #[serde(default)]
    pub rag: RagSettings,

    /// Retry policy for transient upstream failures
    #[serde(default)]
    pub retry: RetrySettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Socket address to bind (e.g., "127.0.0.1:8000")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allowed CORS origins; empty or "*" allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// OpenAI-compatible API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the API
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Chat completion model identifier
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
}

/// Qdrant vector database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantSettings {
    /// Qdrant gRPC URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Collection holding document chunks
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// Retrieval pipeline settings.
///
/// The defaults (600/100 token chunks, 0.7 score threshold, 2x over-fetch)
/// are tuned values carried over from operating the documentation site;
/// they are configuration, not invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Target chunk size in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks with less content than this are discarded
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Number of results returned to the answer stage
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Over-fetch multiplier: fetch_k = fetch_multiplier * top_k
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,

    /// Minimum cosine similarity for a match to count as relevant
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Maximum texts per embedding API call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Minimum delay between embedding batches in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

/// Retry policy settings for transient upstream failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dim() -> usize {
    1536
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "docs".to_string()
}

fn default_chunk_size() -> usize {
    600
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_min_chunk_size() -> usize {
    50
}

fn default_top_k() -> usize {
    4
}

fn default_fetch_multiplier() -> usize {
    2
}

fn default_score_threshold() -> f32 {
    0.7
}

fn default_batch_size() -> usize {
    100
}

fn default_batch_delay_ms() -> u64 {
    1200
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_openai_endpoint(),
            embedding_model: default_embedding_model(),
            embedding_dim: default_embedding_dim(),
            chat_model: default_chat_model(),
        }
    }
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
            top_k: default_top_k(),
            fetch_multiplier: default_fetch_multiplier(),
            score_threshold: default_score_threshold(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            server: ServerSettings::default(),
            openai: OpenAiSettings::default(),
            qdrant: QdrantSettings::default(),
            rag: RagSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config file, and environment.
    ///
    /// Environment variables:
    /// - `DOCBOT_CONFIG`: Path to config file (default: ./docbot.yaml)
    /// - `DOCBOT_BIND`: Server bind address
    /// - `DOCBOT_QDRANT_URL`: Qdrant URL
    /// - `DOCBOT_COLLECTION`: Qdrant collection name
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("DOCBOT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Read the YAML file if present
        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("docbot.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(bind) = std::env::var("DOCBOT_BIND") {
            config.server.bind = bind;
        }
        if let Ok(url) = std::env::var("DOCBOT_QDRANT_URL") {
            config.qdrant.url = url;
        }
        if let Ok(collection) = std::env::var("DOCBOT_COLLECTION") {
            config.qdrant.collection = collection;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut parsed: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        parsed.config_file = Some(path.clone());
        parsed.log_level = self.log_level.clone();
        parsed.no_color = self.no_color;
        parsed.verbose = self.verbose;

        Ok(parsed)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the
    /// config file.
    pub fn with_overrides(
        mut self,
        config_file: Option<PathBuf>,
        bind: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> AppResult<Self> {
        if let Some(config_file) = config_file {
            // An explicitly passed file must exist and parse
            if !config_file.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    config_file
                )));
            }
            self = self.merge_yaml(&config_file)?;
        }

        if let Some(bind) = bind {
            self.server.bind = bind;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        Ok(self)
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> AppResult<String> {
        std::env::var(&self.openai.api_key_env).map_err(|_| {
            AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.openai.api_key_env
            ))
        })
    }

    /// Validate configuration values that would otherwise fail deep inside
    /// the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        if self.rag.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.batch_size == 0 {
            return Err(AppError::Config("batch_size must be positive".to_string()));
        }
        if self.rag.fetch_multiplier == 0 {
            return Err(AppError::Config(
                "fetch_multiplier must be positive".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.rag.score_threshold) {
            return Err(AppError::Config(format!(
                "score_threshold must be within [-1, 1], got {}",
                self.rag.score_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rag.chunk_size, 600);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.min_chunk_size, 50);
        assert_eq!(config.rag.score_threshold, 0.7);
        assert_eq!(config.rag.fetch_multiplier, 2);
        assert_eq!(config.qdrant.collection, "docs");
    }

    #[test]
    fn test_validate_default_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_overlap_too_large() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_threshold() {
        let mut config = AppConfig::default();
        config.rag.score_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  bind: \"0.0.0.0:9000\"\nrag:\n  chunk_size: 400\n  top_k: 6"
        )
        .unwrap();

        let config = AppConfig::default()
            .with_overrides(Some(file.path().to_path_buf()), None, None, false, false)
            .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.rag.chunk_size, 400);
        assert_eq!(config.rag.top_k, 6);
        // Unspecified fields keep their defaults
        assert_eq!(config.rag.chunk_overlap, 100);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default()
            .with_overrides(
                None,
                Some("127.0.0.1:3456".to_string()),
                None,
                true,
                false,
            )
            .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:3456");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let result = AppConfig::default().with_overrides(
            Some(PathBuf::from("/nonexistent/docbot.yaml")),
            None,
            None,
            false,
            false,
        );
        assert!(result.is_err());
    }
}
