//! Core data model: chunks, search results, and fusion configuration.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, Result, RetrievalError};

/// Namespace for name-based chunk IDs. Fixed so that re-splitting identical
/// input yields identical IDs, which gives re-ingestion upsert semantics.
pub const CHUNK_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0xa7, 0xb8, 0x14, 0x9d, 0xad, 0x11, 0xd1, 0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30,
    0xc8,
]);

/// A contiguous slice of a source document, the unit of embedding and indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable chunk ID, derived from `(source, chunk_index)`.
    pub id: Uuid,
    /// Chunk text. Non-empty.
    pub content: String,
    /// Logical document name. Non-empty.
    pub source: String,
    /// Sequence number within the document.
    pub chunk_index: u32,
    /// Open metadata (title, estimated page, document hash).
    pub metadata: HashMap<String, serde_json::Value>,
    /// Embedding vector, populated by the ingestion pipeline.
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Derive the deterministic chunk ID for `(source, chunk_index)`.
    pub fn derive_id(source: &str, chunk_index: u32) -> Uuid {
        Uuid::new_v5(
            &CHUNK_ID_NAMESPACE,
            format!("{}_{}", source, chunk_index).as_bytes(),
        )
    }
}

/// Which search path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Keyword,
    Hybrid,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Semantic => write!(f, "semantic"),
            SearchType::Keyword => write!(f, "keyword"),
            SearchType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Chunk ID the hit refers to.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// Logical document name.
    pub source: String,
    /// Chunk position within the document.
    pub chunk_index: u32,
    /// Relevance score in `[0.0, 1.0]`.
    pub score: f32,
    /// Chunk metadata as stored.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Which search path produced this hit.
    pub search_type: SearchType,
}

impl RetrievalResult {
    /// Build a result, rejecting scores outside `[0.0, 1.0]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        content: String,
        source: String,
        chunk_index: u32,
        score: f32,
        metadata: HashMap<String, serde_json::Value>,
        search_type: SearchType,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&score) {
            return Err(RetrievalError::InvalidScore(score).into());
        }
        Ok(Self {
            id,
            content,
            source,
            chunk_index,
            score,
            metadata,
            search_type,
        })
    }
}

/// Weight tolerance for [`HybridSearchConfig`] validation.
const WEIGHT_SUM_TOLERANCE: f32 = 0.01;

/// Fusion policy for hybrid search. Immutable once constructed; shared
/// read-only across concurrent queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchConfig {
    /// Weight applied to semantic scores.
    pub semantic_weight: f32,
    /// Weight applied to normalized keyword scores.
    pub keyword_weight: f32,
    /// Vector-store score threshold for semantic hits.
    pub min_semantic_score: f32,
    /// Floor for normalized keyword scores.
    pub min_keyword_score: f32,
    /// Maximum results a query may return.
    pub max_results: usize,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            min_semantic_score: 0.5,
            min_keyword_score: 0.3,
            max_results: 10,
        }
    }
}

impl HybridSearchConfig {
    /// Build a config, validating weights and bounds.
    pub fn new(
        semantic_weight: f32,
        keyword_weight: f32,
        min_semantic_score: f32,
        min_keyword_score: f32,
        max_results: usize,
    ) -> Result<Self> {
        let config = Self {
            semantic_weight,
            keyword_weight,
            min_semantic_score,
            min_keyword_score,
            max_results,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check weight sum and bounds.
    pub fn validate(&self) -> Result<()> {
        let sum = self.semantic_weight + self.keyword_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "semantic_weight + keyword_weight must sum to 1.0, got {}",
                sum
            ))
            .into());
        }
        if self.max_results == 0 {
            return Err(ConfigError::Invalid("max_results must be > 0".to_string()).into());
        }
        Ok(())
    }
}

/// Outcome of one ingestion call. Constructed once; immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Whether at least one chunk was written to at least one store.
    pub success: bool,
    /// Logical document name the call was made for.
    pub document_id: String,
    /// Number of chunks written to at least one store.
    pub chunks_count: usize,
    /// Failure description. Set on total failure and on partial failure.
    pub error: Option<String>,
    /// Wall-clock duration of the call.
    pub duration_seconds: f64,
    /// SHA-256 hex digest of the raw input bytes.
    pub document_hash: Option<String>,
    /// Whether the call was short-circuited by the dedup check.
    pub skipped_duplicate: bool,
    /// Prior document ID when `skipped_duplicate` is set.
    pub existing_document_id: Option<String>,
}

/// Per-call ingestion options. Threaded explicitly; never mutates shared
/// coordinator state.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Run the content-hash dedup check before any work.
    pub dedup: bool,
    /// Document title carried into chunk metadata.
    pub title: Option<String>,
    /// Override the configured chunk size for this call.
    pub chunk_size_tokens: Option<usize>,
    /// Override the configured overlap for this call.
    pub overlap_tokens: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            dedup: true,
            title: None,
            chunk_size_tokens: None,
            overlap_tokens: None,
        }
    }
}
