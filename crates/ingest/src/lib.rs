pub mod document;
pub mod embedding;

pub use document::chunker::{chunk_documents, chunk_text, ChunkConfig};
pub use document::{CollectionError, DocumentSource, ExtractionError, PdfCollection, PdfFile};
pub use embedding::{Embedder, EmbeddingError, EmbeddingGenerator};
