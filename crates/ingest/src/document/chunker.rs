//! Sentence-aware, overlapping character chunking.
//!
//! Sizes and offsets are counted in Unicode scalar values, not bytes, so
//! Sinhala text is cut on character boundaries.

use parentkb_core::config::RagConfig;
use parentkb_core::{ChunkMetadata, DocumentChunk, PageText};

/// How far back from a tentative cut we look for a sentence terminator.
pub const SENTENCE_SEARCH_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum characters per chunk (default: 1000).
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks (default: 200).
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl From<&RagConfig> for ChunkConfig {
    fn from(rag: &RagConfig) -> Self {
        Self {
            chunk_size: rag.chunk_size,
            overlap: rag.chunk_overlap,
        }
    }
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// Split `text` into trimmed, non-empty chunks of at most `chunk_size` chars.
/// A `chunk_size` of 0 is treated as 1.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk_size {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        // Not the last window: prefer to cut just after a sentence terminator.
        if end < len {
            let search_start = start.max(end.saturating_sub(SENTENCE_SEARCH_WINDOW));
            if let Some(i) = (search_start + 1..end).rev().find(|&i| is_sentence_end(chars[i])) {
                end = i + 1;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= len {
            break;
        }

        // A boundary pulled back further than the overlap must still make progress.
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Chunk each page independently. Chunk indices restart at 0 on every page.
pub fn chunk_documents(pages: &[PageText], config: &ChunkConfig) -> Vec<DocumentChunk> {
    let mut out = Vec::new();
    for page in pages {
        let chunks = chunk_text(&page.text, config.chunk_size, config.overlap);
        let total = chunks.len() as u32;
        out.extend(chunks.into_iter().enumerate().map(|(idx, text)| DocumentChunk {
            text,
            metadata: ChunkMetadata {
                source: page.source.clone(),
                page: page.page,
                chunk_index: idx as u32,
                total_chunks: total,
            },
        }));
    }
    out
}
