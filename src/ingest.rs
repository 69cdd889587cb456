//! Ingestion pipeline: one unit of work per uploaded document.
//!
//! Orchestrates extract → chunk → embed → index around a ledger record.
//! The ledger row is written *first*, so a crash mid-pipeline always
//! leaves a discoverable `processing` record. All passages of a document
//! are embedded in one batch call and inserted into the index with one
//! bulk `add` — the pipeline never attempts a partial add, which is what
//! keeps a half-indexed document impossible.
//!
//! The index write happens before the terminal ledger write. The two
//! stores are not transactionally coupled: a crash between them can leave
//! a `completed` document without passages or indexed passages without a
//! ledger record. That window is documented, not hidden.
//!
//! Re-uploading an existing filename inserts a fresh ledger row and adds
//! passages alongside the old ones; there is no implicit delete-first.
//! Callers wanting replace semantics delete the filename before
//! re-uploading.
//!
//! Failures are terminal for the document (`failed` status, no automatic
//! retry) and never propagate to whoever scheduled the work. The uploaded
//! temp file is removed on every exit path; a cleanup error is logged and
//! never affects the document's status.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::chunk::ChunkSplitter;
use crate::embedding::Embedder;
use crate::error::IngestError;
use crate::extract::TextExtractor;
use crate::index::VectorIndex;
use crate::ledger::DocumentLedger;
use crate::models::{DocumentStatus, Passage};

pub struct IngestionPipeline {
    ledger: DocumentLedger,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    splitter: ChunkSplitter,
}

impl IngestionPipeline {
    pub fn new(
        ledger: DocumentLedger,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        splitter: ChunkSplitter,
    ) -> Self {
        Self {
            ledger,
            index,
            embedder,
            extractor,
            splitter,
        }
    }

    /// Schedule a document for background processing and return
    /// immediately. Completion is reported only through the ledger status;
    /// nothing is awaited beyond task submission.
    pub fn schedule(self: &Arc<Self>, path: PathBuf, filename: String) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.process(&path, &filename).await;
        });
    }

    /// Process one document to a terminal status. Infallible from the
    /// caller's perspective: every failure ends as a `failed` ledger row
    /// and a log line.
    pub async fn process(&self, path: &Path, filename: &str) {
        let doc_id = match self.ledger.create(filename, Utc::now()).await {
            Ok(id) => id,
            Err(err) => {
                // No ledger row means no status to report; all we can do
                // is log and release the file.
                tracing::error!(filename, error = %err, "failed to record document");
                remove_upload(path);
                return;
            }
        };

        match self.run_stages(path, filename).await {
            Ok(passage_count) => {
                tracing::info!(filename, passage_count, "document ingested");
                if let Err(err) = self.ledger.set_status(doc_id, DocumentStatus::Completed).await {
                    tracing::error!(filename, error = %err, "failed to mark document completed");
                }
            }
            Err(err) => {
                tracing::error!(filename, stage = err.stage(), error = %err, "ingestion failed");
                if let Err(err) = self.ledger.set_status(doc_id, DocumentStatus::Failed).await {
                    tracing::error!(filename, error = %err, "failed to mark document failed");
                }
            }
        }

        remove_upload(path);
    }

    /// Extract, chunk, embed, and index. Returns the number of passages
    /// written. Empty extracted text is not a failure: it yields zero
    /// chunks, skips the embed and add calls, and completes.
    async fn run_stages(&self, path: &Path, filename: &str) -> Result<usize, IngestError> {
        let text = self.extractor.extract(path)?;

        let passages: Vec<Passage> = self
            .splitter
            .split(&text)
            .enumerate()
            .map(|(i, chunk)| Passage {
                id: Uuid::new_v4().to_string(),
                source: filename.to_string(),
                sequence_index: i as i64,
                text: chunk.to_string(),
            })
            .collect();

        if passages.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;

        self.index.add(&passages, &vectors).await?;

        Ok(passages.len())
    }
}

/// Release the temporary uploaded file. Runs on every exit path; an error
/// here is logged and never surfaced as a document failure.
fn remove_upload(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove uploaded file");
        }
    }
}
