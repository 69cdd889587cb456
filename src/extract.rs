//! Text extraction from source documents (PDF).
//!
//! Extraction returns the concatenation, in page order, of each page's
//! extractable text; pages with no extractable text contribute nothing.
//! Failures are errors, never panics — the pipeline converts them into a
//! `failed` document status.

use std::path::Path;

use crate::error::ExtractionError;

/// Pulls raw text out of a source document.
///
/// A trait rather than a free function so the ingestion pipeline can be
/// exercised in tests without binary PDF fixtures; [`PdfExtractor`] is the
/// production implementation.
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document at `path`. The file is
    /// assumed to be fully written to storage already. No side effects
    /// beyond reading.
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// PDF text extraction via `pdf-extract`.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractionError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractionError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
