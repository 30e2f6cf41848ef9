pub mod cache;
pub mod generator;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use cache::QueryCache;
pub use generator::{create_embedder, l2_normalize, EmbeddingGenerator, PASSAGE_PREFIX, QUERY_PREFIX};
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};
