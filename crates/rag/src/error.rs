use parentkb_ingest::{CollectionError, EmbeddingError};
use parentkb_storage::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("document collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector index error: {0}")]
    Index(#[from] IndexError),

    #[error("index was built with {stored}, active model is {active}; reload the knowledge base")]
    StaleIndex { stored: String, active: String },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
