//! Retrieval-augmented generation pipeline for docbot.
//!
//! The pipeline flows in two directions:
//!
//! - Ingestion: [`chunker::Chunker`] splits documents, [`embedding::Embedder`]
//!   turns chunks into vectors, and a [`store::VectorStore`] persists them.
//! - Query: [`retriever::Retriever`] finds relevant chunks and
//!   [`answer::AnswerStreamer`] streams a grounded answer.

pub mod answer;
pub mod chunker;
pub mod embedding;
pub mod ingest;
pub mod inmemory;
pub mod providers;
pub mod qdrant;
pub mod retriever;
pub mod store;
pub mod types;

pub use answer::{AnswerEvent, AnswerStream, AnswerStreamer};
pub use chunker::Chunker;
pub use embedding::{Embedder, EmbeddingProvider};
pub use ingest::Ingestor;
pub use inmemory::InMemoryStore;
pub use qdrant::QdrantStore;
pub use retriever::{Retriever, RetrieverOptions};
pub use store::{SearchFilter, SearchRequest, VectorStore};
pub use types::{DocumentChunk, IngestStats, RetrievalResult, RetrievedChunk, SourceRef};
