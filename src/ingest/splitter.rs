//! Text splitting into overlapping, size-bounded chunks.

use std::collections::HashMap;

use crate::error::{ConfigError, IngestError, Result};
use crate::types::Chunk;

/// Rough token-to-character conversion used for chunk budgets.
pub const CHARS_PER_TOKEN: usize = 4;

/// Characters per estimated page, used for the page metadata field.
const CHARS_PER_PAGE: usize = 3000;

/// Splitter sizing, validated at construction.
#[derive(Debug, Clone, Copy)]
pub struct SplitterConfig {
    /// Target chunk size in approximate tokens.
    pub chunk_size_tokens: usize,
    /// Overlap carried from one chunk into the next, in approximate tokens.
    pub overlap_tokens: usize,
}

/// Splits raw document text into overlapping chunks with stable identifiers.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    config: SplitterConfig,
}

impl ChunkSplitter {
    /// Create a splitter. Fails when `overlap_tokens >= chunk_size_tokens`;
    /// this is a configuration error caught at setup, not per call.
    pub fn new(config: SplitterConfig) -> Result<Self> {
        if config.chunk_size_tokens == 0 {
            return Err(ConfigError::Invalid("chunk_size_tokens must be > 0".to_string()).into());
        }
        if config.overlap_tokens >= config.chunk_size_tokens {
            return Err(ConfigError::Invalid(format!(
                "overlap_tokens ({}) must be smaller than chunk_size_tokens ({})",
                config.overlap_tokens, config.chunk_size_tokens
            ))
            .into());
        }
        Ok(Self { config })
    }

    /// Split `text` into chunks for the named `source`.
    ///
    /// Segments are cut on sentence boundaries (`". "`) and accumulated up to
    /// the character budget. A single sentence longer than the budget is not
    /// subdivided; it becomes its own oversized chunk.
    pub fn split(&self, text: &str, source: &str, title: Option<&str>) -> Result<Vec<Chunk>> {
        if source.trim().is_empty() {
            return Err(IngestError::Invalid("source must be non-empty".to_string()).into());
        }
        if text.trim().is_empty() {
            return Err(IngestError::EmptyInput.into());
        }

        let budget = self.config.chunk_size_tokens * CHARS_PER_TOKEN;
        let mut pieces: Vec<String> = Vec::new();
        let mut buffer = String::new();

        for segment in text.split_inclusive(". ") {
            if !buffer.is_empty() && buffer.len() + segment.len() > budget {
                let seed = self.overlap_tail(&buffer);
                pieces.push(std::mem::take(&mut buffer));
                buffer = seed;
            }
            buffer.push_str(segment);
        }
        if !buffer.trim().is_empty() {
            pieces.push(buffer);
        }

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut last_offset = 0usize;
        let mut chunk_index = 0u32;

        for piece in pieces {
            let content = piece.trim();
            if content.is_empty() {
                continue;
            }

            // O(n) substring search per chunk; acceptable for document-sized
            // inputs. Overlap-seeded chunks may not occur verbatim in the
            // full text, in which case the previous offset carries over.
            let offset = text.find(content).unwrap_or(last_offset);
            last_offset = offset;
            let page = (offset / CHARS_PER_PAGE + 1).max(1);

            let mut metadata = HashMap::new();
            if let Some(title) = title {
                metadata.insert("title".to_string(), serde_json::json!(title));
            }
            metadata.insert("page".to_string(), serde_json::json!(page));

            chunks.push(Chunk {
                id: Chunk::derive_id(source, chunk_index),
                content: content.to_string(),
                source: source.to_string(),
                chunk_index,
                metadata,
                embedding: None,
            });
            chunk_index += 1;
        }

        Ok(chunks)
    }

    /// Trailing words of `buffer` to seed the next chunk with, approximating
    /// `overlap_tokens / chunk_size_tokens` of the chunk by word count.
    fn overlap_tail(&self, buffer: &str) -> String {
        let words: Vec<&str> = buffer.split_whitespace().collect();
        let keep = words.len() * self.config.overlap_tokens / self.config.chunk_size_tokens;
        if keep == 0 {
            return String::new();
        }
        let mut tail = words[words.len() - keep..].join(" ");
        tail.push(' ');
        tail
    }
}
