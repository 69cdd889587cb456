//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! Each component failure is local and recoverable at the document level:
//! ingestion errors are caught by the pipeline and become a terminal
//! `failed` ledger status; query errors propagate to the caller as a single
//! [`QueryError`]. Nothing here aborts the process.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to pull text out of a source document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path} as a PDF: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Unrecoverable failure from the embedding model.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    #[error("embedding provider misconfigured: {0}")]
    Config(String),
}

/// Storage-backend failure from the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index storage backend unavailable: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("batch mismatch: {passages} passages but {vectors} vectors")]
    BatchMismatch { passages: usize, vectors: usize },
}

/// Storage failure from the document ledger.
#[derive(Debug, Error)]
#[error("ledger storage unavailable: {0}")]
pub struct LedgerError(#[from] pub sqlx::Error);

/// Failure answering a question. No partial answer is ever returned.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion service error {status}: {body}")]
    Completion { status: u16, body: String },
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

/// Umbrella over the per-stage ingestion failures. Caught at the pipeline
/// level and converted into a `failed` document status; never propagated to
/// the caller that scheduled the work. Ledger failures are not a stage:
/// the pipeline handles them inline, since a broken ledger leaves no row
/// to record a status on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl IngestError {
    /// Name of the pipeline stage that produced this error, for logging.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::Extraction(_) => "extracting",
            IngestError::Embedding(_) => "embedding",
            IngestError::Index(_) => "indexing",
        }
    }
}
