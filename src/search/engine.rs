//! Retrieval engine: semantic search, keyword search, and hybrid fusion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{Result, RetrievalError};
use crate::ports::{EmbeddingProvider, KeywordStore, ObservabilitySink, VectorHit, VectorStore};
use crate::search::fusion::fuse;
use crate::types::{RetrievalResult, SearchType};

/// Hybrid sub-searches over-fetch by this factor so the fusion step sees more
/// candidates than the final page size.
const HYBRID_FETCH_MULTIPLIER: usize = 2;

/// A primary hit together with its adjacent chunks from the same document.
#[derive(Debug, Clone)]
pub struct ContextualResult {
    /// The ranked hit itself.
    pub result: RetrievalResult,
    /// Chunks at `chunk_index ± 1` from the same source, when the vector
    /// store supports direct lookup. Empty otherwise.
    pub context: Vec<RetrievalResult>,
}

/// Runs semantic, keyword, and hybrid searches against the two indexes.
pub struct RetrievalEngine {
    config: SearchConfig,
    collection: String,
    index: String,
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    keywords: Arc<dyn KeywordStore>,
    sink: Arc<dyn ObservabilitySink>,
}

impl RetrievalEngine {
    /// Create an engine. Fails when the fusion config is invalid.
    pub fn new(
        config: SearchConfig,
        collection: impl Into<String>,
        index: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
        keywords: Arc<dyn KeywordStore>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Result<Self> {
        config.hybrid.validate()?;
        Ok(Self {
            config,
            collection: collection.into(),
            index: index.into(),
            embedder,
            vectors,
            keywords,
            sink,
        })
    }

    /// Run one query and return a ranked list. `top_k` is capped at the
    /// configured `max_results`.
    ///
    /// With `hybrid` set, both sub-searches run concurrently and their scores
    /// are fused; any hybrid-path failure falls back to semantic-only search
    /// for the same query. Only a failure of the fallback itself propagates.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        hybrid: bool,
    ) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery("query must be non-empty".to_string()).into());
        }
        let top_k = top_k.min(self.config.hybrid.max_results);
        let start = Instant::now();
        let search_type = if hybrid {
            SearchType::Hybrid
        } else {
            SearchType::Semantic
        };

        // Against an empty knowledge base there is nothing to rank; skip the
        // embedding call entirely.
        match self.vectors.point_count(&self.collection).await {
            Ok(0) => {
                debug!("Vector collection is empty, returning no results");
                self.sink.record_retrieval(search_type, 0, start.elapsed());
                return Ok(Vec::new());
            }
            Ok(_) => {}
            // The guard is a cost optimization, not a correctness gate; a
            // count failure must not take search down with it.
            Err(e) => warn!("Point count check failed, proceeding: {}", e),
        }

        let results = if hybrid {
            match self.hybrid_search(query, top_k).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("Hybrid search failed, falling back to semantic: {}", e);
                    self.semantic_search(query, top_k).await?
                }
            }
        } else {
            self.semantic_search(query, top_k).await?
        };

        self.sink
            .record_retrieval(search_type, results.len(), start.elapsed());
        Ok(results)
    }

    /// Run one query and expand each hit with its neighboring chunks.
    ///
    /// Degrades to primary-only results when the vector store exposes no
    /// direct lookup.
    pub async fn search_with_context(
        &self,
        query: &str,
        top_k: usize,
        hybrid: bool,
    ) -> Result<Vec<ContextualResult>> {
        let primaries = self.retrieve(query, top_k, hybrid).await?;
        let primary_ids: Vec<String> = primaries.iter().map(|r| r.id.clone()).collect();

        let mut expanded = Vec::with_capacity(primaries.len());
        for primary in primaries {
            let mut context = Vec::new();
            let neighbor_indices = primary
                .chunk_index
                .checked_sub(1)
                .into_iter()
                .chain(std::iter::once(primary.chunk_index + 1));

            for neighbor_index in neighbor_indices {
                match self
                    .vectors
                    .lookup(&self.collection, &primary.source, neighbor_index)
                    .await
                {
                    Ok(Some(hit)) => {
                        if primary_ids.contains(&hit.id) {
                            continue;
                        }
                        // Context chunks inherit the hit's rank; they are
                        // returned for adjacency, not for their own score.
                        if let Ok(neighbor) =
                            result_from_hit(hit, primary.score, primary.search_type)
                        {
                            context.push(neighbor);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!("Context lookup failed, returning primary only: {}", e);
                    }
                }
            }
            expanded.push(ContextualResult {
                result: primary,
                context,
            });
        }
        Ok(expanded)
    }

    /// Embed the query and search the vector index.
    async fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .vectors
            .search(
                &self.collection,
                &embedding,
                limit,
                self.config.hybrid.min_semantic_score,
            )
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let score = hit.score.clamp(0.0, 1.0);
            results.push(result_from_hit(hit, score, SearchType::Semantic)?);
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    /// Search the keyword index, normalizing the store's native 0-100
    /// ranking score into `[0, 1]`.
    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
        let hits = self.keywords.search(&self.index, query, limit).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let score = (hit.ranking_score / 100.0).clamp(0.0, 1.0);
            if score < self.config.hybrid.min_keyword_score {
                continue;
            }
            results.push(RetrievalResult::new(
                hit.document.id,
                hit.document.content,
                hit.document.source,
                hit.document.chunk_index,
                score,
                hit.document.metadata,
                SearchType::Keyword,
            )?);
        }
        Ok(results)
    }

    /// Run both sub-searches concurrently and fuse their scores.
    async fn hybrid_search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let fetch = top_k * HYBRID_FETCH_MULTIPLIER;
        let timeout = Duration::from_millis(self.config.timeout_ms);

        let (semantic, keyword) = tokio::join!(
            tokio::time::timeout(timeout, self.semantic_search(query, fetch)),
            tokio::time::timeout(timeout, self.keyword_search(query, fetch)),
        );

        let semantic =
            semantic.map_err(|_| RetrievalError::Timeout(self.config.timeout_ms))??;
        let keyword = keyword.map_err(|_| RetrievalError::Timeout(self.config.timeout_ms))??;

        Ok(fuse(semantic, keyword, &self.config.hybrid, top_k))
    }
}

/// Build a result from a vector-store hit's stored payload.
fn result_from_hit(hit: VectorHit, score: f32, search_type: SearchType) -> Result<RetrievalResult> {
    let content = hit
        .payload
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let source = hit
        .payload
        .get("source")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let chunk_index = hit
        .payload
        .get("chunk_index")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let metadata: HashMap<String, serde_json::Value> = hit
        .payload
        .get("metadata")
        .and_then(|v| v.as_object())
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    RetrievalResult::new(
        hit.id,
        content,
        source,
        chunk_index,
        score,
        metadata,
        search_type,
    )
}
