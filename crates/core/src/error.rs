use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error in {path}: {details}")]
    PdfParse { path: String, details: String },

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("no pdf files found in {0}")]
    NoPdfFiles(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("loader thread pool could not be created: {0}")]
    ThreadPool(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding count {embeddings} doesn't match chunk count {chunks}")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("embedding dimension {found} != {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("vector index error: {0}")]
    Backend(String),

    #[error("corrupt index at {path}: {details}")]
    Corrupt { path: String, details: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
