//! Braid: a hybrid-retrieval backend.
//!
//! Documents are ingested into two independent indexes, a vector index for
//! semantic search and a full-text index for keyword search, and queries are
//! answered by fusing normalized, weighted scores from both. Store, embedding,
//! extraction, and observability backends all live behind ports in [`ports`].

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod ports;
pub mod search;
pub mod types;

pub use config::{Config, IngestionConfig, SearchConfig};
pub use error::{
    BraidError, ConfigError, EmbeddingError, IngestError, Result, RetrievalError, StoreError,
};
pub use ingest::{
    content_hash, ChunkSplitter, DedupGuard, ExistingDocument, IngestionCoordinator,
    SplitterConfig, DEDUP_SCAN_LIMIT,
};
pub use metrics::{get_metrics, Metrics, PrometheusSink};
pub use ports::{
    EmbeddingProvider, IngestionStatus, KeywordDocument, KeywordHit, KeywordStore, NoopSink,
    ObservabilitySink, PlainTextExtractor, TextExtractor, VectorHit, VectorPoint, VectorStore,
};
pub use search::{ContextualResult, RetrievalEngine};
pub use types::{
    Chunk, HybridSearchConfig, IngestOptions, IngestionResult, RetrievalResult, SearchType,
};
