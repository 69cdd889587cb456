//! Document ledger: durable record of each document's identity, upload
//! time, and processing status.
//!
//! The ledger is independent of the vector index; the two are joined only
//! by `filename`. `create` always inserts — re-uploading a filename makes a
//! new row with a fresh timestamp rather than touching the old one, and
//! `delete_by_filename` removes every historical row sharing the name.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::LedgerError;
use crate::models::{Document, DocumentStatus};

#[derive(Clone)]
pub struct DocumentLedger {
    pool: SqlitePool,
}

impl DocumentLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new document row in `processing` status and return its id.
    pub async fn create(
        &self,
        filename: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<i64, LedgerError> {
        let result = sqlx::query(
            "INSERT INTO documents (filename, upload_date, processing_status) VALUES (?, ?, ?)",
        )
        .bind(filename)
        .bind(uploaded_at.timestamp())
        .bind(DocumentStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Record a document's terminal status. Called at most once per
    /// terminal outcome by convention of the pipeline; the transition is
    /// not re-validated here.
    pub async fn set_status(&self, id: i64, status: DocumentStatus) -> Result<(), LedgerError> {
        sqlx::query("UPDATE documents SET processing_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All documents in insertion order.
    pub async fn list(&self) -> Result<Vec<Document>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, filename, upload_date, processing_status FROM documents ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    /// Every historical row for `filename`, oldest first.
    pub async fn find_by_filename(&self, filename: &str) -> Result<Vec<Document>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, filename, upload_date, processing_status FROM documents \
             WHERE filename = ? ORDER BY id",
        )
        .bind(filename)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    /// Remove all rows for `filename`. Zero matches is a no-op. Returns
    /// the number of rows removed.
    pub async fn delete_by_filename(&self, filename: &str) -> Result<u64, LedgerError> {
        let result = sqlx::query("DELETE FROM documents WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
    let status: String = row.get("processing_status");
    Document {
        id: row.get("id"),
        filename: row.get("filename"),
        upload_date: row.get("upload_date"),
        status: DocumentStatus::from_str_lossy(&status),
    }
}
