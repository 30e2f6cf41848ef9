use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("insert length mismatch: {texts} texts, {vectors} vectors, {metadatas} metadatas")]
    LengthMismatch {
        texts: usize,
        vectors: usize,
        metadatas: usize,
    },

    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt record '{id}': {reason}")]
    Corrupt { id: String, reason: String },
}
