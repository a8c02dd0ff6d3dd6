//! Error types for the braid retrieval backend.

use thiserror::Error;

/// Main error type for braid operations.
#[derive(Error, Debug)]
pub enum BraidError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Ingestion pipeline errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Chunking produced no chunks for {0}")]
    NoChunks(String),

    #[error(
        "Ingestion failed for all chunks - vector: {vector_failures}, keyword: {keyword_failures}"
    )]
    AllChunksFailed {
        vector_failures: usize,
        keyword_failures: usize,
    },
}

/// Embedding-related errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Vector/keyword store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Vector store error: {0}")]
    Vector(String),

    #[error("Keyword store error: {0}")]
    Keyword(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Search-related errors.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Score {0} outside [0.0, 1.0]")]
    InvalidScore(f32),

    #[error("Fusion error: {0}")]
    Fusion(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

/// Result type alias for braid operations.
pub type Result<T> = std::result::Result<T, BraidError>;
