//! Ports to external collaborators.
//!
//! The core never talks to a concrete embedding backend, vector database, or
//! full-text engine. Everything crosses one of these traits behind an
//! `Arc<dyn …>`, so backends can be swapped (or mocked) without touching the
//! ingestion or retrieval logic.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{IngestError, Result};
use crate::types::SearchType;

/// A point to upsert into the vector store.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    /// Point ID. Upserts are idempotent on this.
    pub id: Uuid,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Payload stored alongside the vector (content, source, chunk_index,
    /// metadata).
    pub payload: serde_json::Value,
}

/// A hit returned by the vector store.
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Point ID.
    pub id: String,
    /// Similarity score, comparable within a collection.
    pub score: f32,
    /// Stored payload.
    pub payload: serde_json::Value,
}

/// A document to write into the keyword index.
#[derive(Debug, Clone)]
pub struct KeywordDocument {
    /// Document ID. Writes are idempotent on this.
    pub id: String,
    /// Indexed text.
    pub content: String,
    /// Logical source document name.
    pub source: String,
    /// Chunk position within the source document.
    pub chunk_index: u32,
    /// Stored metadata fields (title, page, document_hash).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A hit returned by the keyword store.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    /// The stored document.
    pub document: KeywordDocument,
    /// Native ranking score on the store's 0-100 scale.
    pub ranking_score: f32,
}

/// Ingestion outcome reported to the observability sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStatus {
    /// At least one chunk landed in at least one store.
    Completed,
    /// The dedup check short-circuited the call.
    Skipped,
    /// No chunk could be written anywhere, or the pipeline aborted.
    Failed,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for one text. No retry logic is assumed
    /// here; providers retry internally if at all.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Trait for the nearest-neighbor index over embedding vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert points into a collection. Idempotent on point ID.
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()>;

    /// Search a collection, dropping hits below `score_threshold`.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorHit>>;

    /// Number of points indexed in a collection.
    async fn point_count(&self, collection: &str) -> Result<usize>;

    /// Direct lookup by `(source, chunk_index)`, used for context expansion.
    ///
    /// Pure nearest-neighbor APIs with no scan/filter support keep this
    /// default, and the retrieval engine degrades to primary-only results.
    async fn lookup(
        &self,
        _collection: &str,
        _source: &str,
        _chunk_index: u32,
    ) -> Result<Option<VectorHit>> {
        Ok(None)
    }
}

/// Trait for the full-text (inverted) index.
#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Add documents to an index. Idempotent on document ID.
    async fn add_documents(&self, index: &str, docs: Vec<KeywordDocument>) -> Result<()>;

    /// Search an index. Hits carry the store's native 0-100 ranking score.
    async fn search(&self, index: &str, query: &str, limit: usize) -> Result<Vec<KeywordHit>>;
}

/// Trait for format-specific text extraction (PDF, DOCX, ...).
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Convert raw bytes to text. Failures abort the document's ingestion.
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String>;
}

/// Fire-and-forget observability port. Implementations must never panic or
/// block the calling path.
pub trait ObservabilitySink: Send + Sync {
    /// Record one ingestion outcome.
    fn record_ingestion(&self, status: IngestionStatus, chunk_count: usize, duration: Duration);

    /// Record one retrieval outcome.
    fn record_retrieval(&self, search_type: SearchType, result_count: usize, duration: Duration);
}

/// Extractor for inputs that are already text.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            IngestError::Extraction(format!("{} is not valid UTF-8: {}", filename, e)).into()
        })
    }
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NoopSink;

impl ObservabilitySink for NoopSink {
    fn record_ingestion(&self, _status: IngestionStatus, _chunk_count: usize, _duration: Duration) {
    }

    fn record_retrieval(
        &self,
        _search_type: SearchType,
        _result_count: usize,
        _duration: Duration,
    ) {
    }
}
