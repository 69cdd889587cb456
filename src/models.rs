//! Core data types that flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an uploaded document.
///
/// A document is created as `Processing` and transitions exactly once to
/// `Completed` or `Failed`. There are no further transitions; a failed
/// document must be re-uploaded to be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// String form stored in the `processing_status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Parse the stored column value. Unknown values map to `Failed` so a
    /// corrupted row never reads back as in-flight work.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "processing" => DocumentStatus::Processing,
            "completed" => DocumentStatus::Completed,
            _ => DocumentStatus::Failed,
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded source file, as recorded in the ledger.
///
/// `filename` is the join key between ledger rows and index entries. It is
/// not unique: re-uploading the same name inserts a new row with a fresh
/// timestamp.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    /// Upload time as a Unix timestamp; set once at creation.
    pub upload_date: i64,
    pub status: DocumentStatus,
}

/// One chunk of a document's extracted text, the unit stored in the
/// vector index.
#[derive(Debug, Clone)]
pub struct Passage {
    pub id: String,
    /// Owning document's filename (back-reference, queried by filter).
    pub source: String,
    /// Position among chunks of the same source; ordering/debugging only,
    /// never used for retrieval ranking.
    pub sequence_index: i64,
    pub text: String,
}

/// A passage returned from a similarity search, best-first.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub sequence_index: i64,
    /// Cosine similarity against the query vector.
    pub score: f64,
}

/// Format a Unix timestamp as ISO-8601 for API output.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
