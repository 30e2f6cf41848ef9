pub mod chunker;
pub mod collection;
mod pdf;

use thiserror::Error;

pub use collection::{CollectionError, DocumentSource, PdfCollection, PdfFile};
pub use pdf::extract_pdf;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page of extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// 1-based page number.
    pub page_number: u32,
    /// The extracted text content, trimmed.
    pub text: String,
}
