//! Retrieval pipeline type definitions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Namespace for deriving stable chunk identifiers from content hashes.
///
/// Using uuid v5 over the content hash makes re-ingestion of unchanged
/// content map to the same point id, so upserts replace instead of
/// duplicating.
const CHUNK_ID_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x8f, 0x2a, 0x41, 0x7c, 0x5d, 0x90, 0x4b, 0x1e, 0xbb, 0x06, 0x3c, 0xd3, 0x55, 0x21, 0x9a,
    0x44,
]);

/// A unit of retrievable text.
///
/// Created by the chunker, enriched with an embedding by the embedder,
/// persisted as a vector-store point, and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable identifier derived from the content hash
    pub id: String,

    /// Chunk text content
    pub text: String,

    /// Approximate token length, used for size accounting
    pub token_count: usize,

    /// Key/value pairs identifying origin (path, chapter, section)
    #[serde(default)]
    pub source: HashMap<String, String>,

    /// SHA-256 hex digest of the normalized text, used for deduplication
    pub content_hash: String,

    /// Embedding vector, populated after the embedding step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    /// Create a chunk from text and source metadata.
    ///
    /// Computes the normalized content hash, the stable id, and the
    /// approximate token count. The embedding starts absent.
    pub fn new(text: String, source: HashMap<String, String>) -> Self {
        let content_hash = content_hash(&text);
        let id = uuid::Uuid::new_v5(&CHUNK_ID_NAMESPACE, content_hash.as_bytes()).to_string();
        let token_count = approx_token_count(&text);

        Self {
            id,
            text,
            token_count,
            source,
            content_hash,
            embedding: None,
        }
    }
}

/// A single match from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The matched chunk's text and metadata (no embedding)
    pub chunk: RetrievedChunk,

    /// Cosine similarity score in [-1, 1]; higher is better
    pub score: f32,
}

/// The payload of a retrieved vector-store point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,

    /// Source metadata
    #[serde(default)]
    pub source: HashMap<String, String>,

    /// Content hash, the deduplication key
    pub content_hash: String,
}

/// A source reference surfaced to the caller alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Human-readable source name (e.g., "sensors.md")
    pub source: String,

    /// Relevance score of the supporting chunk
    pub score: f32,

    /// Short snippet showing the relevant evidence
    pub snippet: String,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of documents read
    pub documents_processed: u32,

    /// Number of chunks created and upserted
    pub chunks_created: u32,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Approximate token count of a text span.
///
/// Uses the common chars/4 heuristic; the pipeline only needs consistent
/// relative sizes, not tokenizer-exact counts.
pub fn approx_token_count(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// SHA-256 hex digest of the normalized text.
///
/// Normalization lowercases and collapses all whitespace runs, so that
/// trivially re-formatted duplicate content still hashes identically.
pub fn content_hash(text: &str) -> String {
    let normalized = normalize_text(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
