//! Ingestion pipeline: splitting, deduplication, and dual-index writing.

mod coordinator;
mod dedup;
mod splitter;

pub use coordinator::IngestionCoordinator;
pub use dedup::{content_hash, DedupGuard, ExistingDocument, DEDUP_SCAN_LIMIT};
pub use splitter::{ChunkSplitter, SplitterConfig, CHARS_PER_TOKEN};
