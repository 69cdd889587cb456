//! Vector index: storage and similarity search over embedded passages.
//!
//! The [`VectorIndex`] trait is the seam between the ingestion/query paths
//! and the storage backend. Implementations are explicitly constructed and
//! injected — there is no module-level store instance — so every test can
//! run against a fresh index.
//!
//! Two implementations:
//! - [`SqliteIndex`] — durable, brute-force cosine scan over BLOB vectors.
//! - [`MemoryIndex`] — `RwLock`'d vectors, for tests and ephemeral use.

use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::IndexError;
use crate::models::{Passage, SearchHit};

/// Stores passage vectors with their text and metadata, and supports
/// nearest-neighbor search plus deletion by source.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert one entry per passage, with `vectors[i]` belonging to
    /// `passages[i]`. The batch commits all-or-nothing: a partial write is
    /// never left behind, so a failed `add` means zero new entries.
    ///
    /// There is no uniqueness constraint on `source` + `sequence_index`;
    /// re-adding the same source creates duplicate entries unless the
    /// caller deletes first.
    async fn add(&self, passages: &[Passage], vectors: &[Vec<f32>]) -> Result<(), IndexError>;

    /// Return the `k` entries most similar to `query`, best-first. Returns
    /// fewer than `k` when the index holds fewer entries, and an empty
    /// result on an empty index.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError>;

    /// Remove every entry whose `source` matches. Matching zero entries is
    /// a no-op. Returns the number of entries removed.
    async fn delete_by_source(&self, source: &str) -> Result<u64, IndexError>;
}

fn check_lengths(passages: &[Passage], vectors: &[Vec<f32>]) -> Result<(), IndexError> {
    if passages.len() != vectors.len() {
        return Err(IndexError::BatchMismatch {
            passages: passages.len(),
            vectors: vectors.len(),
        });
    }
    Ok(())
}

/// SQLite-backed [`VectorIndex`].
///
/// Vectors are stored as little-endian f32 BLOBs in the `passages` table;
/// search is a full scan with cosine scoring, sorted best-first. Batch
/// inserts run in one transaction, which is what gives `add` its
/// all-or-nothing contract.
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(&self, passages: &[Passage], vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        check_lengths(passages, vectors)?;
        if passages.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (passage, vector) in passages.iter().zip(vectors.iter()) {
            sqlx::query(
                "INSERT INTO passages (id, source, sequence_index, text, embedding) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&passage.id)
            .bind(&passage.source)
            .bind(passage.sequence_index)
            .bind(&passage.text)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let rows = sqlx::query("SELECT source, sequence_index, text, embedding FROM passages")
            .fetch_all(&self.pool)
            .await?;

        let mut hits: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                SearchHit {
                    text: row.get("text"),
                    source: row.get("source"),
                    sequence_index: row.get("sequence_index"),
                    score: cosine_similarity(query, &vector) as f64,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn delete_by_source(&self, source: &str) -> Result<u64, IndexError> {
        let result = sqlx::query("DELETE FROM passages WHERE source = ?")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

struct MemoryEntry {
    passage: Passage,
    vector: Vec<f32>,
}

/// In-memory [`VectorIndex`] backed by a `RwLock`'d vector.
pub struct MemoryIndex {
    entries: RwLock<Vec<MemoryEntry>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&self, passages: &[Passage], vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        check_lengths(passages, vectors)?;

        let mut entries = self.entries.write().expect("index lock poisoned");
        for (passage, vector) in passages.iter().zip(vectors.iter()) {
            entries.push(MemoryEntry {
                passage: passage.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let entries = self.entries.read().expect("index lock poisoned");

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .map(|e| SearchHit {
                text: e.passage.text.clone(),
                source: e.passage.source.clone(),
                sequence_index: e.passage.sequence_index,
                score: cosine_similarity(query, &e.vector) as f64,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn delete_by_source(&self, source: &str) -> Result<u64, IndexError> {
        let mut entries = self.entries.write().expect("index lock poisoned");
        let before = entries.len();
        entries.retain(|e| e.passage.source != source);
        Ok((before - entries.len()) as u64)
    }
}
