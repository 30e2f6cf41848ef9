use serde::{Deserialize, Serialize};

/// One page of extracted text, as produced by a document loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub text: String,
    /// Originating file name.
    pub source: String,
    /// 1-based page number, when the loader knows it.
    pub page: Option<u32>,
}

impl PageText {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
        }
    }
}

/// Metadata stored alongside every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: Option<u32>,
    /// 0-based position within the page's chunk sequence.
    pub chunk_index: u32,
    /// Number of chunks derived from the same page.
    pub total_chunks: u32,
}

/// A bounded, trimmed, non-empty slice of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A scored context record returned for a question. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    /// Similarity in [0, 1], higher is better.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_result_serializes_null_page() {
        let res = RetrievalResult {
            text: "some text".to_string(),
            source: "guide.pdf".to_string(),
            page: None,
            score: 0.5,
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"source\":\"guide.pdf\""));
        assert!(json.contains("\"page\":null"));
    }

    #[test]
    fn page_text_constructor() {
        let page = PageText::new("hello", "a.pdf", Some(3));
        assert_eq!(page.source, "a.pdf");
        assert_eq!(page.page, Some(3));
    }
}
