//! Ingestion pipeline.
//!
//! Walks a documentation tree, chunks each file, embeds every chunk, and
//! upserts the results into the vector store. Embedding is all-or-nothing
//! so a failed run never leaves the collection half-updated with vectors
//! from a partially embedded corpus.

use crate::chunker::Chunker;
use crate::embedding::Embedder;
use crate::store::VectorStore;
use crate::types::{DocumentChunk, IngestStats};
use docbot_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

const INGESTED_EXTENSIONS: &[&str] = &["md", "mdx", "txt", "html"];

/// Orchestrates the chunk, embed, and upsert steps.
pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(chunker: Chunker, embedder: Arc<Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Ingest the given documentation files and directory trees.
    ///
    /// Directories are walked recursively for ingestable files; paths
    /// naming a file directly are taken as-is. Unreadable files are
    /// skipped with a warning and do not abort the run. A failed
    /// embedding batch aborts before anything is written, and stable
    /// chunk ids make a rerun over unchanged content replace rather
    /// than duplicate.
    pub async fn ingest(&self, paths: &[PathBuf]) -> AppResult<IngestStats> {
        let started = Instant::now();

        if paths.is_empty() {
            return Err(AppError::Ingest("no paths given".to_string()));
        }

        let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
        for path in paths {
            if path.is_dir() {
                collect_dir(path, &mut files);
            } else if path.is_file() {
                let root = path.parent().unwrap_or(Path::new("")).to_path_buf();
                files.push((root, path.clone()));
            } else {
                return Err(AppError::Ingest(format!(
                    "no such file or directory: {}",
                    path.display()
                )));
            }
        }

        let mut documents = 0u32;
        let mut chunks: Vec<DocumentChunk> = Vec::new();

        for (root, file) in &files {
            if !is_ingestable(file) {
                tracing::warn!(path = %file.display(), "unsupported file type, skipping");
                continue;
            }
            let text = match std::fs::read_to_string(file) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping file");
                    continue;
                }
            };

            documents += 1;
            let source = source_metadata(root, file);
            let file_chunks = self.chunker.chunk(&text, &source);
            tracing::debug!(
                path = %file.display(),
                chunks = file_chunks.len(),
                "chunked document"
            );
            chunks.extend(file_chunks);
        }

        if chunks.is_empty() {
            tracing::info!(documents, "nothing to ingest");
            return Ok(IngestStats {
                documents_processed: documents,
                chunks_created: 0,
                duration_secs: started.elapsed().as_secs_f64(),
            });
        }

        self.embedder.embed_chunks(&mut chunks).await?;

        self.store
            .ensure_collection(self.embedder.dimension())
            .await?;
        let upserted = self.store.upsert(&chunks).await?;

        let stats = IngestStats {
            documents_processed: documents,
            chunks_created: upserted as u32,
            duration_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            documents = stats.documents_processed,
            chunks = stats.chunks_created,
            seconds = format!("{:.1}", stats.duration_secs),
            "ingestion complete"
        );
        Ok(stats)
    }

    /// Convenience wrapper over [`Ingestor::ingest`] for a single tree.
    pub async fn ingest_dir(&self, root: &Path) -> AppResult<IngestStats> {
        if !root.is_dir() {
            return Err(AppError::Ingest(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        self.ingest(&[root.to_path_buf()]).await
    }
}

fn collect_dir(root: &Path, files: &mut Vec<(PathBuf, PathBuf)>) {
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_ingestable(entry.path()) {
            files.push((root.to_path_buf(), entry.path().to_path_buf()));
        }
    }
}

fn is_ingestable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| INGESTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn source_metadata(root: &Path, path: &Path) -> HashMap<String, String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut source = HashMap::new();
    source.insert("path".to_string(), relative.display().to_string());
    if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
        source.insert("title".to_string(), name.to_string());
    }
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryStore;
    use crate::providers::MockEmbeddingProvider;
    use docbot_core::RetryPolicy;
    use std::io::Write;
    use std::time::Duration;

    fn ingestor(store: Arc<InMemoryStore>) -> Ingestor {
        let embedder = Arc::new(Embedder::new(
            Arc::new(MockEmbeddingProvider::new(64)),
            100,
            Duration::ZERO,
            RetryPolicy::default(),
        ));
        Ingestor::new(Chunker::new(200, 20, 5), embedder, store)
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "sensors.md",
            &"The lidar sensor scans the environment twenty times per second. ".repeat(10),
        );
        write_file(
            dir.path(),
            "guides/battery.mdx",
            &"Battery charging follows a three stage curve with trickle finish. ".repeat(10),
        );
        write_file(dir.path(), "image.png", "not text");

        let store = Arc::new(InMemoryStore::new());
        let stats = ingestor(Arc::clone(&store))
            .ingest_dir(dir.path())
            .await
            .unwrap();

        assert_eq!(stats.documents_processed, 2);
        assert!(stats.chunks_created > 0);
        assert_eq!(store.count().await.unwrap(), stats.chunks_created as u64);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "notes.txt",
            &"Waypoints are stored in the mission planner database table. ".repeat(10),
        );

        let store = Arc::new(InMemoryStore::new());
        let ing = ingestor(Arc::clone(&store));
        let first = ing.ingest_dir(dir.path()).await.unwrap();
        let second = ing.ingest_dir(dir.path()).await.unwrap();

        assert_eq!(first.chunks_created, second.chunks_created);
        // Unchanged content maps to the same ids, so the count is stable
        assert_eq!(store.count().await.unwrap(), first.chunks_created as u64);
    }

    #[tokio::test]
    async fn test_ingest_mixed_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "docs/sensors.md",
            &"Lidar calibration requires a level surface and stable light. ".repeat(10),
        );
        write_file(
            dir.path(),
            "changelog.txt",
            &"Release two adds over the air firmware updates and rollback. ".repeat(10),
        );

        let store = Arc::new(InMemoryStore::new());
        let stats = ingestor(Arc::clone(&store))
            .ingest(&[dir.path().join("docs"), dir.path().join("changelog.txt")])
            .await
            .unwrap();

        assert_eq!(stats.documents_processed, 2);
        assert!(store.count().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let store = Arc::new(InMemoryStore::new());
        let result = ingestor(store)
            .ingest_dir(Path::new("/nonexistent/docs"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_directory_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryStore::new());
        let stats = ingestor(Arc::clone(&store))
            .ingest_dir(dir.path())
            .await
            .unwrap();
        assert_eq!(stats.documents_processed, 0);
        assert_eq!(stats.chunks_created, 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_ingestable_extensions() {
        assert!(is_ingestable(Path::new("a/b.md")));
        assert!(is_ingestable(Path::new("a/b.MDX")));
        assert!(is_ingestable(Path::new("page.html")));
        assert!(!is_ingestable(Path::new("photo.png")));
        assert!(!is_ingestable(Path::new("Makefile")));
    }

    #[test]
    fn test_source_metadata_relative_path() {
        let source = source_metadata(Path::new("/docs"), Path::new("/docs/guides/setup.md"));
        assert_eq!(source.get("path").map(String::as_str), Some("guides/setup.md"));
        assert_eq!(source.get("title").map(String::as_str), Some("setup"));
    }
}
