//! Whole-document deduplication by content hash.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::ports::KeywordStore;

/// How many keyword-index entries the dedup check scans per lookup.
///
/// The check is a bounded page scan, not an indexed lookup: past this many
/// stored chunks, duplicates may go undetected and prior chunk counts may
/// undercount. A dedicated hash-to-document index would remove the bound, but
/// would also change the check's performance characteristics, so the cap is
/// kept explicit here instead.
pub const DEDUP_SCAN_LIMIT: usize = 1000;

/// Compute the SHA-256 hex digest of raw document bytes.
///
/// Hashing happens before extraction and chunking, so a byte-identical upload
/// is recognized even when extraction is non-deterministic.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A previously ingested document found by the dedup check.
#[derive(Debug, Clone)]
pub struct ExistingDocument {
    /// Logical document name of the prior ingestion.
    pub document_id: String,
    /// How many of the prior document's chunks the scan saw.
    pub chunk_count: usize,
}

/// Checks whether a content hash is already present in the keyword index.
pub struct DedupGuard {
    keywords: Arc<dyn KeywordStore>,
    index: String,
    scan_limit: usize,
}

impl DedupGuard {
    pub fn new(keywords: Arc<dyn KeywordStore>, index: impl Into<String>, scan_limit: usize) -> Self {
        Self {
            keywords,
            index: index.into(),
            scan_limit,
        }
    }

    /// Look for stored chunks carrying `hash` in their `document_hash` field.
    ///
    /// The keyword store is queried with the hash string itself; hits are then
    /// filtered to exact `document_hash` matches, since full-text matching may
    /// surface unrelated documents that merely mention the digest.
    pub async fn find_existing(&self, hash: &str) -> Result<Option<ExistingDocument>> {
        let hits = self.keywords.search(&self.index, hash, self.scan_limit).await?;

        let mut document_id: Option<String> = None;
        let mut chunk_count = 0usize;

        for hit in hits {
            let stored = hit
                .document
                .metadata
                .get("document_hash")
                .and_then(|v| v.as_str());
            if stored == Some(hash) {
                document_id.get_or_insert_with(|| hit.document.source.clone());
                chunk_count += 1;
            }
        }

        match document_id {
            Some(document_id) => {
                debug!(
                    document_id = %document_id,
                    chunk_count,
                    "Content hash already indexed"
                );
                Ok(Some(ExistingDocument {
                    document_id,
                    chunk_count,
                }))
            }
            None => Ok(None),
        }
    }
}
