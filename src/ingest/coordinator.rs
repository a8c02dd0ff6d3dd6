//! Ingestion coordinator: extraction, chunking, embedding, dual-index write.
//!
//! The coordinator runs one document per call through the pipeline:
//! validate, dedup check, extract, chunk, embed + dual write, aggregate.
//! Callers always receive an [`IngestionResult`]; total failure is reported
//! as `success == false`, never as a propagated error.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::IngestionConfig;
use crate::error::{IngestError, Result};
use crate::ingest::dedup::{content_hash, DedupGuard};
use crate::ingest::splitter::{ChunkSplitter, SplitterConfig};
use crate::ports::{
    EmbeddingProvider, IngestionStatus, KeywordDocument, KeywordStore, ObservabilitySink,
    TextExtractor, VectorPoint, VectorStore,
};
use crate::types::{Chunk, IngestOptions, IngestionResult};

/// Per-chunk write outcome. Each store is accounted for independently;
/// a chunk counts as successful when at least one store took it.
struct ChunkWriteOutcome {
    vector_ok: bool,
    keyword_ok: bool,
}

/// Orchestrates ingestion of one document into both indexes.
pub struct IngestionCoordinator {
    config: IngestionConfig,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    keywords: Arc<dyn KeywordStore>,
    sink: Arc<dyn ObservabilitySink>,
    splitter: ChunkSplitter,
    dedup: DedupGuard,
}

impl IngestionCoordinator {
    /// Create a coordinator. Fails when the configured chunk sizing is
    /// invalid (`overlap_tokens >= chunk_size_tokens`).
    pub fn new(
        config: IngestionConfig,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
        keywords: Arc<dyn KeywordStore>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Result<Self> {
        let splitter = ChunkSplitter::new(SplitterConfig {
            chunk_size_tokens: config.chunk_size_tokens,
            overlap_tokens: config.overlap_tokens,
        })?;
        let dedup = DedupGuard::new(
            keywords.clone(),
            config.index.clone(),
            config.dedup_scan_limit,
        );
        Ok(Self {
            config,
            extractor,
            embedder,
            vectors,
            keywords,
            sink,
            splitter,
            dedup,
        })
    }

    /// Ingest one document. `filename` doubles as the logical document name.
    ///
    /// Cancelling the returned future stops issuing further per-chunk work;
    /// chunks already written stay committed (each write is independent).
    pub async fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        options: IngestOptions,
    ) -> IngestionResult {
        let start = Instant::now();

        let result = match self.run_pipeline(bytes, filename, &options, start).await {
            Ok(result) => result,
            Err(e) => {
                warn!(document_id = %filename, "Ingestion failed: {}", e);
                IngestionResult {
                    success: false,
                    document_id: filename.to_string(),
                    chunks_count: 0,
                    error: Some(e.to_string()),
                    duration_seconds: start.elapsed().as_secs_f64(),
                    document_hash: None,
                    skipped_duplicate: false,
                    existing_document_id: None,
                }
            }
        };

        let status = if result.skipped_duplicate {
            IngestionStatus::Skipped
        } else if result.success {
            IngestionStatus::Completed
        } else {
            IngestionStatus::Failed
        };
        self.sink
            .record_ingestion(status, result.chunks_count, start.elapsed());

        result
    }

    async fn run_pipeline(
        &self,
        bytes: &[u8],
        filename: &str,
        options: &IngestOptions,
        start: Instant,
    ) -> Result<IngestionResult> {
        if bytes.is_empty() {
            return Err(IngestError::EmptyInput.into());
        }

        let hash = content_hash(bytes);

        if options.dedup && self.config.dedup_enabled {
            match self.dedup.find_existing(&hash).await {
                Ok(Some(existing)) => {
                    info!(
                        document_id = %filename,
                        existing = %existing.document_id,
                        "Skipping duplicate document"
                    );
                    return Ok(IngestionResult {
                        success: true,
                        document_id: filename.to_string(),
                        chunks_count: existing.chunk_count,
                        error: None,
                        duration_seconds: start.elapsed().as_secs_f64(),
                        document_hash: Some(hash),
                        skipped_duplicate: true,
                        existing_document_id: Some(existing.document_id),
                    });
                }
                Ok(None) => {}
                // A transiently unreachable keyword index must not block
                // writes; the worst case is re-ingesting a duplicate, which
                // deterministic chunk IDs turn into an upsert.
                Err(e) => warn!("Dedup check failed, continuing: {}", e),
            }
        }

        let text = self.extractor.extract(bytes, filename).await?;

        let splitter = self.splitter_for(options)?;
        let mut chunks = splitter.split(&text, filename, options.title.as_deref())?;
        if chunks.is_empty() {
            return Err(IngestError::NoChunks(filename.to_string()).into());
        }
        for chunk in &mut chunks {
            chunk
                .metadata
                .insert("document_hash".to_string(), serde_json::json!(hash));
        }

        let total = chunks.len();
        // Chunk identity was assigned before the fan-out, so completion order
        // does not affect reported counts or positional metadata.
        let outcomes: Vec<ChunkWriteOutcome> = stream::iter(chunks)
            .map(|chunk| self.write_chunk(chunk))
            .buffer_unordered(self.config.max_concurrent_embeds)
            .collect()
            .await;

        let successful = outcomes
            .iter()
            .filter(|o| o.vector_ok || o.keyword_ok)
            .count();
        let vector_failures = outcomes.iter().filter(|o| !o.vector_ok).count();
        let keyword_failures = outcomes.iter().filter(|o| !o.keyword_ok).count();

        if successful == 0 {
            return Err(IngestError::AllChunksFailed {
                vector_failures,
                keyword_failures,
            }
            .into());
        }

        let error = if vector_failures > 0 || keyword_failures > 0 {
            Some(format!(
                "Partial failures - vector: {}, keyword: {}",
                vector_failures, keyword_failures
            ))
        } else {
            None
        };

        info!(
            document_id = %filename,
            chunks = successful,
            total,
            "Document ingested"
        );

        Ok(IngestionResult {
            success: true,
            document_id: filename.to_string(),
            chunks_count: successful,
            error,
            duration_seconds: start.elapsed().as_secs_f64(),
            document_hash: Some(hash),
            skipped_duplicate: false,
            existing_document_id: None,
        })
    }

    /// Splitter for this call. Per-call overrides build a fresh splitter;
    /// the shared one is never mutated.
    fn splitter_for(&self, options: &IngestOptions) -> Result<ChunkSplitter> {
        if options.chunk_size_tokens.is_none() && options.overlap_tokens.is_none() {
            return Ok(self.splitter.clone());
        }
        ChunkSplitter::new(SplitterConfig {
            chunk_size_tokens: options
                .chunk_size_tokens
                .unwrap_or(self.config.chunk_size_tokens),
            overlap_tokens: options.overlap_tokens.unwrap_or(self.config.overlap_tokens),
        })
    }

    /// Embed one chunk and write it to both stores.
    ///
    /// An embedding failure counts against both stores; the chunk could not
    /// be written anywhere. Store failures never abort the other store's
    /// write or the remaining chunks.
    async fn write_chunk(&self, mut chunk: Chunk) -> ChunkWriteOutcome {
        let embedding = match self.embedder.embed(&chunk.content).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(chunk_id = %chunk.id, "Embedding failed: {}", e);
                return ChunkWriteOutcome {
                    vector_ok: false,
                    keyword_ok: false,
                };
            }
        };
        chunk.embedding = Some(embedding.clone());

        let payload = serde_json::json!({
            "content": chunk.content,
            "source": chunk.source,
            "chunk_index": chunk.chunk_index,
            "metadata": chunk.metadata,
        });

        let vector_ok = match self
            .vectors
            .upsert(
                &self.config.collection,
                vec![VectorPoint {
                    id: chunk.id,
                    vector: embedding,
                    payload,
                }],
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(chunk_id = %chunk.id, "Vector write failed: {}", e);
                false
            }
        };

        let keyword_ok = match self
            .keywords
            .add_documents(
                &self.config.index,
                vec![KeywordDocument {
                    id: chunk.id.to_string(),
                    content: chunk.content.clone(),
                    source: chunk.source.clone(),
                    chunk_index: chunk.chunk_index,
                    metadata: chunk.metadata.clone(),
                }],
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(chunk_id = %chunk.id, "Keyword write failed: {}", e);
                false
            }
        };

        ChunkWriteOutcome {
            vector_ok,
            keyword_ok,
        }
    }
}
